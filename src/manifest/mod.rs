//! Dependency-manifest records.
//!
//! A [`DependencyRecord`] is a tracked reference to a directory containing a
//! recognized dependency manifest, a `Cartfile` or a `Podfile`. Records are
//! what the roster orders and persists, and what update runs operate on.
//!
//! Construction is validating: [`DependencyRecord::from_path`] only returns
//! a record when the path really resolves to a manifest, and callers filter
//! the `None`s out of candidate batches instead of handling errors. The one
//! exception is decoding persisted state, where a location that has since
//! disappeared from disk produces a renderable *invalid* record rather than
//! a decode failure.

pub mod discovery;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::CartwheelError;

pub use discovery::{discover, discover_all};

/// The recognized manifest flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// A Carthage-style `Cartfile`.
    Cartfile,
    /// A CocoaPods-style `Podfile`.
    Podfile,
}

impl ManifestKind {
    /// All manifest kinds, in the order discovery tries them.
    pub const ALL: [ManifestKind; 2] = [ManifestKind::Cartfile, ManifestKind::Podfile];

    /// The file name that marks a directory as this kind of
    /// dependency-definition root.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            ManifestKind::Cartfile => "Cartfile",
            ManifestKind::Podfile => "Podfile",
        }
    }

    /// Whether `name` is this kind's manifest file name, matched
    /// case-insensitively to tolerate case-insensitive file systems.
    #[must_use]
    pub fn matches_file_name(self, name: &str) -> bool {
        name.eq_ignore_ascii_case(self.file_name())
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Stable identity of a record, used to key per-record update state.
///
/// Identity is the canonicalized absolute location plus the manifest kind:
/// two records pointing at the same directory with the same kind are the
/// same record, while records in different directories that happen to share
/// a folder name are not. Canonicalization falls back to the stored path for
/// invalid records whose location no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    path: PathBuf,
    kind: ManifestKind,
}

/// A tracked reference to a dependency-manifest directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    name: String,
    location: PathBuf,
    kind: ManifestKind,
    valid: bool,
}

impl DependencyRecord {
    /// Construct a record from a user-supplied path.
    ///
    /// Accepts either the manifest file itself (the effective location is
    /// normalized to the parent directory) or a directory directly
    /// containing the manifest file. Anything else yields `None`; callers
    /// assembling batches filter rather than fail.
    pub fn from_path(path: &Path, kind: ManifestKind) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;

        if metadata.is_file() {
            let file_name = path.file_name()?.to_str()?;
            if !kind.matches_file_name(file_name) {
                return None;
            }
            let location = path.parent()?.to_path_buf();
            let name = directory_name(&location)?;
            return Some(Self {
                name,
                location,
                kind,
                valid: true,
            });
        }

        if metadata.is_dir() && path.join(kind.file_name()).is_file() {
            let name = directory_name(path)?;
            return Some(Self {
                name,
                location: path.to_path_buf(),
                kind,
                valid: true,
            });
        }

        None
    }

    /// Rebuild a record from its persisted form.
    ///
    /// Never fails: a location whose manifest has disappeared since the
    /// record was stored comes back as an invalid record carrying the
    /// last-known name, so it can still be rendered and removed.
    #[must_use]
    pub fn from_stored(stored: StoredRecord) -> Self {
        let valid = stored.location.join(stored.kind.file_name()).is_file();
        Self {
            name: stored.name,
            location: stored.location,
            kind: stored.kind,
            valid,
        }
    }

    /// Convert to the persisted form.
    #[must_use]
    pub fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            name: self.name.clone(),
            location: self.location.clone(),
            kind: self.kind,
        }
    }

    /// Display name, derived from the containing folder name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory containing the manifest file.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Which manifest flavor this record tracks.
    #[must_use]
    pub const fn kind(&self) -> ManifestKind {
        self.kind
    }

    /// Whether the manifest file existed on disk when this record was
    /// constructed or last decoded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Full path of the manifest file this record points at.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.location.join(self.kind.file_name())
    }

    /// Identity for keying update state. See [`RecordId`].
    #[must_use]
    pub fn id(&self) -> RecordId {
        let path = self.location.canonicalize().unwrap_or_else(|_| self.location.clone());
        RecordId {
            path,
            kind: self.kind,
        }
    }
}

impl fmt::Display for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.location.display())
    }
}

/// The serde on-disk form of a record: location and last-known display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Last-known display name.
    pub name: String,
    /// Directory containing the manifest file.
    pub location: PathBuf,
    /// Which manifest flavor the record tracks.
    pub kind: ManifestKind,
}

/// Create an empty manifest of `kind` inside `directory`, refusing to
/// overwrite an existing file.
///
/// Returns the path of the created file.
///
/// # Errors
///
/// [`CartwheelError::ManifestExists`] when the file is already present;
/// other filesystem errors are propagated with context.
pub fn write_blank(kind: ManifestKind, directory: &Path) -> Result<PathBuf> {
    let path = directory.join(kind.file_name());
    match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => Ok(path),
        Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(CartwheelError::ManifestExists {
                path: path.display().to_string(),
            }
            .into())
        }
        Err(error) => Err(anyhow::Error::new(error)
            .context(format!("Failed to create manifest at {}", path.display()))),
    }
}

/// Final path component as a display name.
fn directory_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_with_manifest(temp: &TempDir, project: &str, kind: ManifestKind) -> PathBuf {
        let dir = temp.path().join(project);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(kind.file_name()), "").unwrap();
        dir
    }

    #[test]
    fn test_from_directory_containing_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = project_with_manifest(&temp, "MyApp", ManifestKind::Cartfile);

        let record = DependencyRecord::from_path(&dir, ManifestKind::Cartfile).unwrap();
        assert_eq!(record.name(), "MyApp");
        assert_eq!(record.location(), dir);
        assert!(record.is_valid());
    }

    #[test]
    fn test_from_manifest_file_normalizes_to_parent() {
        let temp = TempDir::new().unwrap();
        let dir = project_with_manifest(&temp, "MyApp", ManifestKind::Podfile);

        let record =
            DependencyRecord::from_path(&dir.join("Podfile"), ManifestKind::Podfile).unwrap();
        assert_eq!(record.location(), dir);
        assert_eq!(record.name(), "MyApp");
    }

    #[test]
    fn test_file_name_matching_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Shouty");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("CARTFILE");
        std::fs::write(&file, "").unwrap();

        let record = DependencyRecord::from_path(&file, ManifestKind::Cartfile).unwrap();
        assert_eq!(record.name(), "Shouty");
    }

    #[test]
    fn test_construction_fails_without_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Empty");
        std::fs::create_dir_all(&dir).unwrap();

        assert!(DependencyRecord::from_path(&dir, ManifestKind::Cartfile).is_none());
        assert!(DependencyRecord::from_path(&dir.join("missing"), ManifestKind::Cartfile).is_none());
        // A Podfile does not satisfy a Cartfile lookup
        std::fs::write(dir.join("Podfile"), "").unwrap();
        assert!(DependencyRecord::from_path(&dir, ManifestKind::Cartfile).is_none());
    }

    #[test]
    fn test_stored_roundtrip_preserves_identity() {
        let temp = TempDir::new().unwrap();
        let dir = project_with_manifest(&temp, "Roundtrip", ManifestKind::Cartfile);

        let record = DependencyRecord::from_path(&dir, ManifestKind::Cartfile).unwrap();
        let decoded = DependencyRecord::from_stored(record.to_stored());
        assert_eq!(decoded, record);
        assert!(decoded.is_valid());
    }

    #[test]
    fn test_deleted_manifest_decodes_to_invalid_record() {
        let temp = TempDir::new().unwrap();
        let dir = project_with_manifest(&temp, "Gone", ManifestKind::Cartfile);
        let record = DependencyRecord::from_path(&dir, ManifestKind::Cartfile).unwrap();
        let stored = record.to_stored();

        std::fs::remove_file(dir.join("Cartfile")).unwrap();

        let decoded = DependencyRecord::from_stored(stored);
        assert!(!decoded.is_valid());
        assert_eq!(decoded.name(), "Gone");
        assert_eq!(decoded.location(), dir);
    }

    #[test]
    fn test_identity_distinguishes_same_folder_name() {
        let temp = TempDir::new().unwrap();
        let a = project_with_manifest(&temp, "one/App", ManifestKind::Cartfile);
        let b = project_with_manifest(&temp, "two/App", ManifestKind::Cartfile);

        let record_a = DependencyRecord::from_path(&a, ManifestKind::Cartfile).unwrap();
        let record_b = DependencyRecord::from_path(&b, ManifestKind::Cartfile).unwrap();

        assert_eq!(record_a.name(), record_b.name());
        assert_ne!(record_a.id(), record_b.id());
        assert_eq!(record_a.id(), record_a.id());
    }

    #[test]
    fn test_write_blank_refuses_overwrite() {
        let temp = TempDir::new().unwrap();

        let path = write_blank(ManifestKind::Cartfile, temp.path()).unwrap();
        assert_eq!(path, temp.path().join("Cartfile"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        let err = write_blank(ManifestKind::Cartfile, temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::core::CartwheelError>(),
            Some(crate::core::CartwheelError::ManifestExists { .. })
        ));
    }
}
