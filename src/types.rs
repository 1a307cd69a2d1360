//! Shared data model used by every pipeline stage.
//!
//! Records are decoded from YAML by a [`ContentSource`](crate::source::ContentSource),
//! kept immutable for the rest of the run, and re-emitted as JSON for the
//! `services/{id}.json` mirrors. The JSON shape follows the field order
//! declared here so the mirrors are stable from run to run.

use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cataloged destination, as stored in `unsorted/{id}.yaml`.
///
/// The identifier is not part of the stored record: it is derived from the
/// storage key and carried alongside the record as `(id, record)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Display name. Must be non-empty: it drives alphabetic bucketing.
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_keys: Vec<PublicKey>,
    /// Any other top-level keys, preserved verbatim.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ServiceRecord {
    /// Reject records the generator cannot place or export.
    ///
    /// An empty display name has no bucket, and a public key without a usable
    /// identifier has no export file name.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("service name is empty".into());
        }
        for (idx, key) in self.public_keys.iter().enumerate() {
            let Some(key_id) = key.export_id() else {
                return Err(format!(
                    "public key #{} has neither an id nor a fingerprint",
                    idx + 1
                ));
            };
            if !naming::is_safe_component(key_id) {
                return Err(format!("public key id '{key_id}' is not a valid file name"));
            }
        }
        Ok(())
    }
}

/// A public key attached to a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Armored key material, exported byte for byte.
    pub value: String,
}

impl PublicKey {
    /// Identifier used for `keys/{id}.txt`: the key id, else its fingerprint.
    pub fn export_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.fingerprint.as_deref().filter(|s| !s.is_empty()))
    }
}

/// A named grouping of services, stored as `tagged/{name}/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    /// Member service ids in source-listing order.
    pub members: Vec<String>,
}

/// One annotation shown on a service page, e.g. `{level: warning, text: ...}`.
pub type Alert = BTreeMap<String, String>;

/// Service id → annotations, loaded from the optional alerts file.
pub type Alerts = BTreeMap<String, Vec<Alert>>;
