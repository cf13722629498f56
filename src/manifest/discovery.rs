//! Bounded-depth manifest discovery.
//!
//! When the user hands Cartwheel a path (a dropped folder, an argument to
//! `cartwheel add`), every recognized manifest in a bounded subtree becomes
//! a candidate record. The walk skips hidden entries and stops
//! `search_depth` levels below the starting directory so a carelessly
//! dropped home directory does not trigger a full-disk scan.

use std::path::Path;
use walkdir::WalkDir;

use super::{DependencyRecord, ManifestKind};

/// Discover all dependency records under `path`, descending at most `depth`
/// directory levels.
///
/// `path` may also be a manifest file itself, in which case the single
/// matching record is returned. Results are in walk order; no deduplication
/// is performed (roster uniqueness is not enforced).
pub fn discover(path: &Path, depth: usize) -> Vec<DependencyRecord> {
    let mut records = Vec::new();

    let walker = WalkDir::new(path)
        .max_depth(depth)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!("Skipping unreadable entry during discovery: {error}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        for kind in ManifestKind::ALL {
            if kind.matches_file_name(&file_name) {
                if let Some(record) = DependencyRecord::from_path(entry.path(), kind) {
                    records.push(record);
                }
                break;
            }
        }
    }

    records
}

/// Discover records under each of `paths` in turn, concatenating the
/// per-path results.
pub fn discover_all<P: AsRef<Path>>(paths: &[P], depth: usize) -> Vec<DependencyRecord> {
    paths.iter().flat_map(|path| discover(path.as_ref(), depth)).collect()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(temp: &TempDir, relative: &str) {
        let path = temp.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discovers_both_kinds_in_tree() {
        let temp = TempDir::new().unwrap();
        manifest(&temp, "AppOne/Cartfile");
        manifest(&temp, "AppTwo/Podfile");
        manifest(&temp, "AppThree/README.md");

        let mut names: Vec<String> = discover(temp.path(), 4)
            .into_iter()
            .map(|record| record.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["AppOne", "AppTwo"]);
    }

    #[test]
    fn test_depth_bound_is_respected() {
        let temp = TempDir::new().unwrap();
        manifest(&temp, "near/Cartfile");
        manifest(&temp, "a/b/c/d/e/far/Cartfile");

        let records = discover(temp.path(), 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "near");
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        manifest(&temp, ".hidden/Cartfile");
        manifest(&temp, "visible/Cartfile");

        let records = discover(temp.path(), 3);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "visible");
    }

    #[test]
    fn test_direct_file_path_yields_single_record() {
        let temp = TempDir::new().unwrap();
        manifest(&temp, "App/Podfile");

        let records = discover(&temp.path().join("App/Podfile"), 4);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "App");
        assert_eq!(records[0].kind(), ManifestKind::Podfile);
    }

    #[test]
    fn test_discover_all_concatenates_in_argument_order() {
        let temp = TempDir::new().unwrap();
        manifest(&temp, "one/Cartfile");
        manifest(&temp, "two/Cartfile");

        let records =
            discover_all(&[temp.path().join("two"), temp.path().join("one")], 2);
        let names: Vec<&str> = records.iter().map(DependencyRecord::name).collect();
        assert_eq!(names, vec!["two", "one"]);
    }
}
