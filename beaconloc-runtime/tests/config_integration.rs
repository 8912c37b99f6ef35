//! Preset catalogue files and hot reload

mod common;

use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, SystemTime};

use beaconloc_runtime::{DeploymentWatcher, PresetCatalog, RuntimeError};
use common::{write_catalog, CATALOG};

#[test]
fn catalogue_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), CATALOG);

    let catalog = PresetCatalog::load(&path).unwrap();
    assert_eq!(catalog.keys().collect::<Vec<_>>(), ["house", "room"]);
    assert_eq!(catalog.name("house"), Some("Two levels"));

    let house = catalog.deployment("house").unwrap();
    assert!(house.is_multi_floor());
    assert_eq!(house.floor_of_gateway("gw-up"), Some(1));
}

#[test]
fn missing_images_are_listed_relative_to_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    std::fs::write(dir.path().join("ground.png"), b"png").unwrap();

    let catalog = PresetCatalog::load(&path).unwrap();
    let missing = catalog.validate_assets("house").unwrap();
    assert_eq!(missing, [dir.path().join("upper.png")]);

    assert!(matches!(catalog.validate_assets("nowhere"), Err(RuntimeError::UnknownPreset(_))));
}

#[test]
fn invalid_layout_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let duplicated = CATALOG.replace("\"gw-up\"", "\"gw-1\"");
    let path = write_catalog(dir.path(), &duplicated);

    let catalog = PresetCatalog::load(&path).unwrap();
    assert!(matches!(catalog.deployment("house"), Err(RuntimeError::Localization(_))));
}

#[test]
fn watcher_publishes_reloaded_deployment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), CATALOG);

    let (mut watcher, rx) = DeploymentWatcher::new(&path, "room").unwrap();
    assert_eq!(rx.borrow().name(), "Test room");
    assert!(!watcher.poll().unwrap());

    // Make sure the modification time moves even on coarse filesystems
    std::thread::sleep(Duration::from_millis(1100));
    write_catalog(dir.path(), &CATALOG.replace("Test room", "Renamed room"));

    assert!(watcher.poll().unwrap());
    assert_eq!(rx.borrow().name(), "Renamed room");
}

#[test]
fn failed_reload_keeps_previous_deployment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    let (mut watcher, rx) = DeploymentWatcher::new(&path, "room").unwrap();

    std::thread::sleep(Duration::from_millis(1100));
    write_catalog(dir.path(), "{ not json");

    assert!(matches!(watcher.poll(), Err(RuntimeError::Json(_))));
    assert_eq!(rx.borrow().name(), "Test room");
}

/// Pin a file's modification time
fn set_mtime(path: &Path, time: SystemTime) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

#[test]
fn partial_write_is_retried_with_same_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    let (mut watcher, rx) = DeploymentWatcher::new(&path, "room").unwrap();

    let stamp = SystemTime::now() + Duration::from_secs(60);
    let renamed = CATALOG.replace("Test room", "Renamed room");
    write_catalog(dir.path(), &renamed[..renamed.len() / 2]);
    set_mtime(&path, stamp);
    assert!(watcher.poll().is_err());
    assert_eq!(rx.borrow().name(), "Test room");

    write_catalog(dir.path(), &renamed);
    set_mtime(&path, stamp);
    assert!(watcher.poll().unwrap());
    assert_eq!(rx.borrow().name(), "Renamed room");
    assert!(!watcher.poll().unwrap());
}
