//! Shared test utilities for the oniontree-html test suite.
//!
//! Provides fixture setup plus lookup helpers that work with index-phase data
//! structures (`SiteIndex`, `ServiceRecord`, `Tag`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let index = build_index(&LocalSource::new(tmp.path())).unwrap();
//!
//! let alpha = find_service(&index, "abc");
//! assert_eq!(alpha.name, "Alpha");
//! assert_eq!(find_tag(&index, "news").members, ["abc", "lima"]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::index::SiteIndex;
use crate::types::{ServiceRecord, Tag};

// =========================================================================
// Fixture setup
// =========================================================================

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Copy `fixtures/oniontree/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    copy_dir_recursive(&fixtures_dir().join("oniontree"), tmp.path()).unwrap();
    tmp
}

/// The read-only template fixture directory.
pub fn fixture_templates() -> PathBuf {
    fixtures_dir().join("templates")
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Index lookups (panic with the available choices on a miss)
// =========================================================================

/// Find a service by id. Panics if not found.
pub fn find_service<'a>(index: &'a SiteIndex, id: &str) -> &'a ServiceRecord {
    index.service(id).unwrap_or_else(|| {
        let ids = service_ids(index);
        panic!("service '{id}' not found. Available: {ids:?}")
    })
}

/// Find a tag by name. Panics if not found.
pub fn find_tag<'a>(index: &'a SiteIndex, name: &str) -> &'a Tag {
    index.tag(name).unwrap_or_else(|| {
        let names = tag_names(index);
        panic!("tag '{name}' not found. Available: {names:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All service ids in listing order.
pub fn service_ids(index: &SiteIndex) -> Vec<&str> {
    index.services.iter().map(|(id, _)| id.as_str()).collect()
}

/// All tag names in listing order.
pub fn tag_names(index: &SiteIndex) -> Vec<&str> {
    index.tags.iter().map(|t| t.name.as_str()).collect()
}
