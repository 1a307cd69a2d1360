//! Output tree writer.
//!
//! All paths handed to [`OutputWriter`] are relative to the output root and
//! use `/` separators. Writes overwrite unconditionally; running twice into
//! the same directory leaves the same tree.

use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("cannot write {}: {source}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug)]
pub struct OutputWriter {
    root: PathBuf,
    written: Vec<String>,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    /// Create `rel` (and its parents) under the root.
    pub fn ensure_dir(&self, rel: &str) -> Result<(), WriteError> {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).map_err(|source| WriteError { path, source })
    }

    /// Write `bytes` to `rel`, creating parent directories as needed.
    pub fn write_file(&mut self, rel: &str, bytes: impl AsRef<[u8]>) -> Result<(), WriteError> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, bytes).map_err(|source| WriteError { path, source })?;
        tracing::debug!(path = rel, "Wrote");
        self.written.push(rel.to_string());
        Ok(())
    }

    /// Relative paths written so far, in write order.
    pub fn written(&self) -> &[String] {
        &self.written
    }
}
