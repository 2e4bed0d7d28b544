//! Hot reload against a real config directory.

use std::fs;
use std::time::{Duration, Instant};

use piece_manager_mod::config::{
    ConfigReloadCoordinator, ConfigStore, ReloadOutcome, Toggle, WatchError,
};

mod common;

#[tokio::test]
async fn test_two_quick_edits_reload_once() {
    let (_dir, file) = common::scratch_config();
    let speed = file.bind("1 - General", "Speed", 1u32, "How fast").unwrap();
    file.save().unwrap();
    let path = file.location().full_path();

    let coordinator = ConfigReloadCoordinator::new(file.location().clone(), file.clone());
    let mut queue = coordinator.start().unwrap();

    common::replace_line(&path, "Speed = 1", "Speed = 5");
    tokio::time::sleep(Duration::from_millis(100)).await;
    common::replace_line(&path, "Speed = 5", "Speed = 6");

    let outcomes = common::pump_for(&coordinator, &mut queue, Duration::from_millis(600)).await;

    assert_eq!(common::count(&outcomes, ReloadOutcome::Reloaded), 1, "{outcomes:?}");
    assert_eq!(speed.value(), 6);
    coordinator.stop();
}

#[test]
fn test_start_without_directory_is_fatal() {
    let (dir, file) = common::scratch_config();
    let location = file.location().clone();
    drop(dir);

    let coordinator = ConfigReloadCoordinator::new(location, file);
    let err = coordinator.start().err().unwrap();

    assert!(matches!(err, WatchError::DirectoryMissing { .. }));
    coordinator.stop();
}

#[test]
fn test_malformed_edit_is_contained() {
    let (_dir, file) = common::scratch_config();
    let lock = file.bind("1 - General", "Lock", Toggle::On, "lock").unwrap();
    file.save().unwrap();
    file.set_save_on_set(true);
    fs::write(file.location().full_path(), "[\"1 - General\"\nLock = ").unwrap();

    let coordinator = ConfigReloadCoordinator::new(file.location().clone(), file.clone());
    let now = Instant::now();

    assert_eq!(coordinator.on_filesystem_event(now), ReloadOutcome::Failed);
    assert!(file.save_on_set());
    assert_eq!(lock.value(), Toggle::On);
    assert_eq!(coordinator.last_reload(), Some(now));
}

#[test]
fn test_deleted_file_then_valid_write_reloads() {
    let (_dir, file) = common::scratch_config();
    let speed = file.bind("1 - General", "Speed", 1u32, "How fast").unwrap();
    file.save().unwrap();
    let path = file.location().full_path();
    let saved = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let coordinator = ConfigReloadCoordinator::new(file.location().clone(), file.clone());
    let t0 = Instant::now();
    assert_eq!(coordinator.on_filesystem_event(t0), ReloadOutcome::FileMissing);
    assert_eq!(coordinator.last_reload(), None);

    fs::write(&path, saved.replace("Speed = 1", "Speed = 8")).unwrap();
    let t1 = t0 + coordinator.debounce() + Duration::from_millis(1);
    assert_eq!(coordinator.on_filesystem_event(t1), ReloadOutcome::Reloaded);
    assert_eq!(speed.value(), 8);
}

#[test]
fn test_shutdown_flushes_in_memory_state() {
    let (_dir, file) = common::scratch_config();
    let speed = file.bind("1 - General", "Speed", 1u32, "How fast").unwrap();
    file.save().unwrap();
    speed.set(9).unwrap();
    file.set_save_on_set(true);

    let coordinator = ConfigReloadCoordinator::new(file.location().clone(), file.clone());
    let mut events = file.subscribe();
    coordinator.shutdown().unwrap();

    let content = fs::read_to_string(file.location().full_path()).unwrap();
    assert!(content.contains("Speed = 9"));
    assert!(file.save_on_set());

    let mut saves = 0;
    while let Ok(event) = events.try_recv() {
        if event == piece_manager_mod::config::ConfigEvent::Saved {
            saves += 1;
        }
    }
    assert_eq!(saves, 1);
}
