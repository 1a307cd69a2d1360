//! Content sources: where the service repository is read from.
//!
//! The [`ContentSource`] trait is the read-only query contract every stage
//! downstream relies on. Two implementations exist:
//!
//! | Source | Root locator | Listing | Record fetch |
//! |---|---|---|---|
//! | [`LocalSource`] | checkout directory | `read_dir` | read `unsorted/{id}.yaml` |
//! | [`RemoteSource`] | contents API base URL | `GET {dir}` | `GET unsorted/{id}.yaml`, base64 envelope |
//!
//! Both return listings sorted by entry name, so "source-listing order" is
//! the same whichever backend produced it. Both validate every identifier as
//! a safe path component and every record via
//! [`ServiceRecord::validate`](crate::types::ServiceRecord::validate) before
//! handing it out.

pub mod local;
pub mod remote;

pub use local::LocalSource;
pub use remote::RemoteSource;

use crate::config::ContentLocation;
use crate::naming;
use crate::types::ServiceRecord;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cannot decode '{id}': {message}")]
    Decode { id: String, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub(crate) fn decode(id: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            id: id.into(),
            message: message.to_string(),
        }
    }
}

/// Read-only query contract shared by every content source.
pub trait ContentSource {
    /// All service ids, sorted by storage key.
    fn list_service_ids(&self) -> Result<Vec<String>, SourceError>;

    /// Fetch and decode one service record.
    fn get_service(&self, id: &str) -> Result<ServiceRecord, SourceError>;

    /// All tag names, sorted.
    fn list_tags(&self) -> Result<Vec<String>, SourceError>;

    /// Ids of the services tagged with `tag`, sorted by storage key.
    fn list_tag_members(&self, tag: &str) -> Result<Vec<String>, SourceError>;

    /// Last modification time of a record as `YYYY-MM-DD HH:MM:SS UTC`, when
    /// the source can tell.
    fn service_last_update(&self, _id: &str) -> Option<String> {
        None
    }
}

/// Open the source a config points at.
pub fn open_source(location: &ContentLocation) -> Result<Box<dyn ContentSource>, SourceError> {
    match location {
        ContentLocation::Local(root) => {
            tracing::info!(root = %root.display(), "Reading local repository");
            Ok(Box::new(LocalSource::new(root)))
        }
        ContentLocation::Remote { base_url, timeout } => {
            tracing::info!(url = %base_url, "Reading remote repository");
            Ok(Box::new(RemoteSource::new(base_url.as_str(), *timeout)?))
        }
    }
}

/// Decode a YAML record and check it is usable.
pub(crate) fn decode_record(id: &str, bytes: &[u8]) -> Result<ServiceRecord, SourceError> {
    let record: ServiceRecord =
        serde_yaml::from_slice(bytes).map_err(|e| SourceError::decode(id, e))?;
    record.validate().map_err(|msg| SourceError::decode(id, msg))?;
    Ok(record)
}

/// Turn raw listing entry names into sorted identifiers.
///
/// Hidden entries are dropped and duplicates collapsed. With `strip_suffix`, the storage suffix is
/// removed (`abc.yaml` → `abc`); tag directories keep their full name.
pub(crate) fn listing_ids<I>(names: I, strip_suffix: bool) -> Result<Vec<String>, SourceError>
where
    I: IntoIterator<Item = String>,
{
    let mut ids = Vec::new();
    for name in names {
        if naming::is_hidden(&name) {
            continue;
        }
        let id = if strip_suffix {
            naming::strip_storage_suffix(&name).to_string()
        } else {
            name
        };
        if !naming::is_safe_component(&id) {
            return Err(SourceError::decode(id, "not a valid identifier"));
        }
        ids.push(id);
    }
    ids.sort();
    ids.dedup();
    Ok(ids)
}
