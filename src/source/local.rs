//! Content source backed by a local checkout of the repository.
//!
//! ```text
//! oniontree/
//! ├── unsorted/
//! │   ├── abc.yaml            # one record per service, keyed by id
//! │   └── dread.yaml
//! └── tagged/
//!     ├── forum/
//!     │   └── dread.yaml      # marker entry (usually a symlink to ../../unsorted/dread.yaml)
//!     └── news/
//!         └── abc.yaml
//! ```

use super::{ContentSource, SourceError, decode_record, listing_ids};
use crate::naming;
use crate::types::ServiceRecord;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SERVICES_DIR: &str = "unsorted";
const TAGS_DIR: &str = "tagged";

#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root
            .join(SERVICES_DIR)
            .join(naming::record_file_name(id))
    }
}

fn io_error(path: &Path, what: &str, err: io::Error) -> SourceError {
    if err.kind() == io::ErrorKind::NotFound {
        SourceError::NotFound(format!("{what} {}", path.display()))
    } else {
        SourceError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

/// Names of the entries of `dir`, optionally only subdirectories.
fn read_entry_names(dir: &Path, dirs_only: bool) -> Result<Vec<String>, SourceError> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, "directory", e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, "directory", e))?;
        if dirs_only && !entry.path().is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

impl ContentSource for LocalSource {
    fn list_service_ids(&self) -> Result<Vec<String>, SourceError> {
        let names = read_entry_names(&self.root.join(SERVICES_DIR), false)?;
        listing_ids(names, true)
    }

    fn get_service(&self, id: &str) -> Result<ServiceRecord, SourceError> {
        if !naming::is_safe_component(id) {
            return Err(SourceError::NotFound(format!("service '{id}'")));
        }
        let path = self.record_path(id);
        let bytes = fs::read(&path).map_err(|e| io_error(&path, "service record", e))?;
        decode_record(id, &bytes)
    }

    fn list_tags(&self) -> Result<Vec<String>, SourceError> {
        let names = read_entry_names(&self.root.join(TAGS_DIR), true)?;
        listing_ids(names, false)
    }

    fn list_tag_members(&self, tag: &str) -> Result<Vec<String>, SourceError> {
        if !naming::is_safe_component(tag) {
            return Err(SourceError::NotFound(format!("tag '{tag}'")));
        }
        let names = read_entry_names(&self.root.join(TAGS_DIR).join(tag), false)?;
        listing_ids(names, true)
    }

    fn service_last_update(&self, id: &str) -> Option<String> {
        if !naming::is_safe_component(id) {
            return None;
        }
        let modified = fs::metadata(self.record_path(id)).ok()?.modified().ok()?;
        let modified: DateTime<Utc> = modified.into();
        Some(modified.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    #[test]
    fn lists_services_sorted_without_suffix() {
        let tmp = setup_fixtures();
        let source = LocalSource::new(tmp.path());
        assert_eq!(
            source.list_service_ids().unwrap(),
            vec!["abc", "bravo", "dread", "echo", "lima"]
        );
    }

    #[test]
    fn lists_tag_directories() {
        let tmp = setup_fixtures();
        let source = LocalSource::new(tmp.path());
        assert_eq!(source.list_tags().unwrap(), vec!["forum", "news", "scam"]);
    }

    #[test]
    fn lists_tag_members() {
        let tmp = setup_fixtures();
        let source = LocalSource::new(tmp.path());
        assert_eq!(source.list_tag_members("news").unwrap(), vec!["abc", "lima"]);
    }

    #[test]
    fn decodes_service_record() {
        let tmp = setup_fixtures();
        let source = LocalSource::new(tmp.path());
        let record = source.get_service("abc").unwrap();
        assert_eq!(record.name, "Alpha");
        assert_eq!(record.public_keys.len(), 1);
        assert!(record.public_keys[0].value.contains("BEGIN PGP PUBLIC KEY BLOCK"));
    }

    #[test]
    fn missing_service_is_not_found() {
        let tmp = setup_fixtures();
        let source = LocalSource::new(tmp.path());
        assert!(matches!(
            source.get_service("nope"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn missing_tag_is_not_found() {
        let tmp = setup_fixtures();
        let source = LocalSource::new(tmp.path());
        assert!(matches!(
            source.list_tag_members("nope"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn missing_unsorted_dir_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let source = LocalSource::new(tmp.path());
        assert!(matches!(
            source.list_service_ids(),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn malformed_record_is_decode_error() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("unsorted/broken.yaml"), "name: [oops").unwrap();
        let source = LocalSource::new(tmp.path());
        assert!(matches!(
            source.get_service("broken"),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn hidden_entries_ignored() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("unsorted/.gitkeep"), "").unwrap();
        fs::write(tmp.path().join("tagged/news/.gitkeep"), "").unwrap();
        let source = LocalSource::new(tmp.path());
        assert!(!source.list_service_ids().unwrap().contains(&".gitkeep".to_string()));
        assert_eq!(source.list_tag_members("news").unwrap(), vec!["abc", "lima"]);
    }

    #[test]
    fn marker_with_and_without_suffix_lists_once() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("tagged/news/abc"), "").unwrap();
        let source = LocalSource::new(tmp.path());
        assert_eq!(source.list_tag_members("news").unwrap(), vec!["abc", "lima"]);
    }

    #[test]
    fn stray_files_in_tagged_are_not_tags() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("tagged/README.md"), "notes").unwrap();
        let source = LocalSource::new(tmp.path());
        assert_eq!(source.list_tags().unwrap(), vec!["forum", "news", "scam"]);
    }

    #[test]
    fn last_update_formats_mtime() {
        let tmp = setup_fixtures();
        let source = LocalSource::new(tmp.path());
        let stamp = source.service_last_update("abc").unwrap();
        assert!(stamp.ends_with(" UTC"));
        assert_eq!(stamp.len(), "2024-01-01 00:00:00 UTC".len());
        assert_eq!(source.service_last_update("nope"), None);
    }
}
