//! Plugin load, live edit and unload.

use std::thread;
use std::time::{Duration, Instant};

use piece_manager_mod::config::{ConfigStore, ReloadOutcome, Toggle, WatchError};
use piece_manager_mod::{PluginContext, PluginError, PluginOptions};

mod common;

fn options(dir: &std::path::Path) -> PluginOptions {
    let mut options = PluginOptions::new(dir);
    options.debounce = Duration::from_millis(200);
    options
}

fn pump_for(plugin: &mut PluginContext, window: Duration) -> Vec<ReloadOutcome> {
    let deadline = Instant::now() + window;
    let mut outcomes = Vec::new();
    while Instant::now() < deadline {
        outcomes.extend(plugin.pump());
        thread::sleep(Duration::from_millis(20));
    }
    outcomes
}

#[test]
fn test_awake_writes_config_and_restores_save_on_set() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = PluginContext::awake(options(dir.path())).unwrap();

    let content = std::fs::read_to_string(plugin.config().location().full_path()).unwrap();
    assert!(content.contains("[\"1 - General\"]"));
    assert!(content.contains(
        "## If on, the configuration is locked and can be changed by server admins only. [Synced with Server]"
    ));
    assert!(content.contains("\"Lock Configuration\" = \"On\""));
    assert!(plugin
        .config()
        .location()
        .file_name()
        .ends_with("{azumatt}.PieceManagerModTemplate.cfg"));

    assert!(plugin.config().save_on_set());
    assert!(plugin.sync().is_locked());
    assert!(plugin.localizer().is_loaded());
    assert_eq!(plugin.pieces().pieces().len(), 4);
    assert!(plugin.piece_configs().is_empty());
    assert!(plugin.coordinator().is_watching());

    plugin.on_destroy();
    plugin.on_destroy();
    assert!(!plugin.coordinator().is_watching());
}

#[test]
fn test_awake_without_config_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let result = PluginContext::awake(options(&missing));

    assert!(matches!(
        result,
        Err(PluginError::Watch(WatchError::DirectoryMissing { .. }))
    ));
    assert!(!missing.exists());
}

#[test]
fn test_external_edit_unlocks_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut plugin = PluginContext::awake(options(dir.path())).unwrap();
    let path = plugin.config().location().full_path();

    // Let the notifications caused by loading settle.
    pump_for(&mut plugin, Duration::from_millis(300));
    thread::sleep(Duration::from_millis(300));

    common::replace_line(
        &path,
        "\"Lock Configuration\" = \"On\"",
        "\"Lock Configuration\" = \"Off\"",
    );
    let outcomes = pump_for(&mut plugin, Duration::from_millis(500));

    assert_eq!(common::count(&outcomes, ReloadOutcome::Reloaded), 1, "{outcomes:?}");
    assert_eq!(plugin.server_config_locked().value(), Toggle::Off);
    assert!(!plugin.sync().is_locked());
    assert!(plugin.config().save_on_set());

    plugin.on_destroy();
}
