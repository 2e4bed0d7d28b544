//! Shared helpers for integration tests.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use piece_manager_mod::config::{
    ConfigFile, ConfigFileLocation, ConfigReloadCoordinator, ConfigStore, NotificationQueue,
    PluginMetadata, ReloadOutcome,
};

/// A config file in a fresh scratch directory, save-on-set disabled.
#[allow(dead_code)]
pub fn scratch_config() -> (tempfile::TempDir, Arc<ConfigFile>) {
    let dir = tempfile::tempdir().unwrap();
    let meta = PluginMetadata::new("tester", "HotReload", "1.0.0");
    let location = ConfigFileLocation::new(dir.path(), &meta.guid());
    let file = Arc::new(ConfigFile::new(location, meta));
    file.set_save_on_set(false);
    (dir, file)
}

/// Rewrite one `key = value` line of a file in place.
pub fn replace_line(path: &Path, from: &str, to: &str) {
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains(from), "'{from}' not found in:\n{content}");
    std::fs::write(path, content.replace(from, to)).unwrap();
}

/// Feed queued notifications to the coordinator for `window`.
#[allow(dead_code)]
pub async fn pump_for(
    coordinator: &ConfigReloadCoordinator,
    queue: &mut NotificationQueue,
    window: Duration,
) -> Vec<ReloadOutcome> {
    let deadline = Instant::now() + window;
    let mut outcomes = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, queue.next()).await {
            Ok(Some(notification)) => {
                outcomes.push(coordinator.on_filesystem_event(notification.received_at));
            }
            Ok(None) | Err(_) => break,
        }
    }
    outcomes
}

pub fn count(outcomes: &[ReloadOutcome], wanted: ReloadOutcome) -> usize {
    outcomes.iter().filter(|o| **o == wanted).count()
}
