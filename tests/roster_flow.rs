//! Roster persistence and discovery flows exercised end to end on a real
//! filesystem.

use tempfile::TempDir;

use cartwheel::config::Settings;
use cartwheel::manifest::{DependencyRecord, ManifestKind, discover, write_blank};
use cartwheel::roster::{Roster, RosterEvent};

fn isolated_settings(storage: &TempDir) -> Settings {
    Settings {
        storage_dir: Some(storage.path().to_path_buf()),
        ..Settings::default()
    }
}

fn manifest_dir(root: &TempDir, relative: &str, kind: ManifestKind) -> std::path::PathBuf {
    let dir = root.path().join(relative);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(kind.file_name()), "").unwrap();
    dir
}

#[tokio::test]
async fn discovered_records_survive_a_restart() {
    let storage = TempDir::new().unwrap();
    let projects = TempDir::new().unwrap();
    manifest_dir(&projects, "Alpha", ManifestKind::Cartfile);
    manifest_dir(&projects, "Beta/Nested", ManifestKind::Podfile);

    let settings = isolated_settings(&storage);
    {
        let mut roster = Roster::load(&settings).unwrap();
        let mut found = discover(projects.path(), 4);
        found.sort_by(|a, b| a.name().cmp(b.name()));
        roster.append_all(found);
        roster.flush().await;
    }

    let reloaded = Roster::load(&settings).unwrap();
    let names: Vec<&str> = reloaded.records().iter().map(DependencyRecord::name).collect();
    assert_eq!(names, vec!["Alpha", "Nested"]);
    assert!(reloaded.records().iter().all(DependencyRecord::is_valid));
    assert_eq!(reloaded.records()[1].kind(), ManifestKind::Podfile);
}

#[tokio::test]
async fn deleted_manifest_comes_back_as_invalid_record() {
    let storage = TempDir::new().unwrap();
    let projects = TempDir::new().unwrap();
    let dir = manifest_dir(&projects, "Doomed", ManifestKind::Cartfile);

    let settings = isolated_settings(&storage);
    {
        let mut roster = Roster::load(&settings).unwrap();
        roster.append(DependencyRecord::from_path(&dir, ManifestKind::Cartfile).unwrap());
        roster.flush().await;
    }

    std::fs::remove_file(dir.join("Cartfile")).unwrap();

    let reloaded = Roster::load(&settings).unwrap();
    assert_eq!(reloaded.len(), 1);
    let record = &reloaded.records()[0];
    assert!(!record.is_valid());
    assert_eq!(record.name(), "Doomed");
    assert_eq!(record.location(), dir);
}

#[tokio::test]
async fn rapid_mutations_persist_the_final_state() {
    let storage = TempDir::new().unwrap();
    let projects = TempDir::new().unwrap();

    let settings = isolated_settings(&storage);
    let mut roster = Roster::load(&settings).unwrap();
    for name in ["a", "b", "c", "d"] {
        let dir = manifest_dir(&projects, name, ManifestKind::Cartfile);
        roster.append(DependencyRecord::from_path(&dir, ManifestKind::Cartfile).unwrap());
    }
    roster.move_ranges(&[0..1], 3);
    roster.remove_ranges(&[1..2]);
    roster.flush().await;

    let reloaded = Roster::load(&settings).unwrap();
    let names: Vec<&str> = reloaded.records().iter().map(DependencyRecord::name).collect();
    assert_eq!(names, vec!["b", "d", "a"]);
}

#[tokio::test]
async fn blank_manifest_becomes_a_trackable_record() {
    let storage = TempDir::new().unwrap();
    let projects = TempDir::new().unwrap();
    let dir = projects.path().join("Fresh");
    std::fs::create_dir_all(&dir).unwrap();

    let path = write_blank(ManifestKind::Podfile, &dir).unwrap();
    assert_eq!(path, dir.join("Podfile"));

    let settings = isolated_settings(&storage);
    let mut roster = Roster::load(&settings).unwrap();
    let mut events = roster.subscribe();

    let record = DependencyRecord::from_path(&dir, ManifestKind::Podfile).unwrap();
    roster.append(record);
    assert_eq!(events.recv().await, Some(RosterEvent::Changed));
    roster.flush().await;

    let reloaded = Roster::load(&settings).unwrap();
    assert_eq!(reloaded.records()[0].name(), "Fresh");
    assert!(reloaded.records()[0].is_valid());
}
