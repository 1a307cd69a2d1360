//! Per-service alert annotations.
//!
//! The alerts file is a YAML mapping from service id to a list of free-form
//! records:
//!
//! ```yaml
//! dread:
//!   - level: warning
//!     message: Mirror down since March.
//! ```
//!
//! It is read once at startup. An id missing from the file simply has no
//! alerts.

use crate::config::ConfigError;
use crate::types::{Alert, Alerts};
use std::fs;
use std::path::Path;

/// Load alerts from `path`, or an empty mapping when no file is configured.
pub fn load_alerts(path: Option<&Path>) -> Result<Alerts, ConfigError> {
    let Some(path) = path else {
        return Ok(Alerts::new());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let alerts = parse_alerts(&content).map_err(|source| ConfigError::Alerts {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), services = alerts.len(), "Loaded alerts");
    Ok(alerts)
}

/// An empty document is an empty mapping.
fn parse_alerts(content: &str) -> Result<Alerts, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Alerts::new());
    }
    serde_yaml::from_str(content)
}

/// Alerts for one service; empty when it has none.
pub fn alerts_for<'a>(alerts: &'a Alerts, id: &str) -> &'a [Alert] {
    alerts.get(id).map(Vec::as_slice).unwrap_or(&[])
}
