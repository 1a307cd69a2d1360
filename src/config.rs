//! Generator configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. stock defaults ([`GeneratorConfig::default`]),
//! 2. an optional TOML file passed with `--config`,
//! 3. command-line flags ([`Overrides`]).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! # templates = "templates"       # Template directory (required to build)
//! # oniontree = "oniontree"       # Local checkout of the repository
//! output = "."                    # Output root
//! remote = false                  # Read the hosted repository instead
//! remote_url = "https://api.github.com/repos/onionltd/oniontree/contents"
//! remote_timeout_secs = 30
//! frontpage_omit_tags = []        # Members of these tags are left off index.html
//! # alerts = "alerts.yaml"        # Per-service annotations
//! target = "clearnet"             # "clearnet" or "onion"
//! otb_version = ""                # Bookmarks version label shown in pages
//! ```
//!
//! Unknown keys are rejected to catch typos early. Once resolved, the
//! configuration is turned into an explicit [`GenerationContext`]; nothing
//! downstream reads flags or environment directly.

use crate::naming;
use crate::source::remote::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::types::Alerts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("alerts file {}: {source}", .path.display())]
    Alerts {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Output flavor: which links and template branches are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Clearnet,
    Onion,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Clearnet => "clearnet",
            Target::Onion => "onion",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generator configuration, as read from `--config` and flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oniontree: Option<PathBuf>,
    pub output: PathBuf,
    pub remote: bool,
    pub remote_url: String,
    pub remote_timeout_secs: u64,
    pub frontpage_omit_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<PathBuf>,
    pub target: Target,
    pub otb_version: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            templates: None,
            oniontree: None,
            output: PathBuf::from("."),
            remote: false,
            remote_url: DEFAULT_BASE_URL.to_string(),
            remote_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            frontpage_omit_tags: Vec::new(),
            alerts: None,
            target: Target::Clearnet,
            otb_version: String::new(),
        }
    }
}

/// Where the repository is read from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentLocation {
    Local(PathBuf),
    Remote { base_url: String, timeout: Duration },
}

/// Values given on the command line. `None` leaves the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub templates: Option<PathBuf>,
    pub oniontree: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub remote: bool,
    pub remote_url: Option<String>,
    /// Raw comma-separated list, as typed.
    pub frontpage_omit_tags: Option<String>,
    pub alerts: Option<PathBuf>,
    pub target: Option<Target>,
    pub otb_version: Option<String>,
}

impl GeneratorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote_timeout_secs must be greater than zero".into(),
            ));
        }
        if !(self.remote_url.starts_with("http://") || self.remote_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "remote_url must be an http(s) URL, got '{}'",
                self.remote_url
            )));
        }
        if let Some(tag) = self
            .frontpage_omit_tags
            .iter()
            .find(|t| !naming::is_safe_component(t))
        {
            return Err(ConfigError::Validation(format!(
                "frontpage_omit_tags contains an invalid tag name '{tag}'"
            )));
        }
        Ok(())
    }

    /// Apply command-line values on top of this config.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(templates) = overrides.templates {
            self.templates = Some(templates);
        }
        if let Some(oniontree) = overrides.oniontree {
            self.oniontree = Some(oniontree);
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
        if overrides.remote {
            self.remote = true;
        }
        if let Some(url) = overrides.remote_url {
            self.remote_url = url;
        }
        if let Some(tags) = overrides.frontpage_omit_tags {
            self.frontpage_omit_tags = parse_tag_list(&tags);
        }
        if let Some(alerts) = overrides.alerts {
            self.alerts = Some(alerts);
        }
        if let Some(target) = overrides.target {
            self.target = target;
        }
        if let Some(version) = overrides.otb_version {
            self.otb_version = version;
        }
    }

    /// The template directory, which every build needs.
    pub fn templates_dir(&self) -> Result<&Path, ConfigError> {
        self.templates
            .as_deref()
            .ok_or_else(|| ConfigError::Validation("templates not specified".into()))
    }

    /// Resolve where the repository is read from.
    ///
    /// `remote` wins over a local path when both are set.
    pub fn content_location(&self) -> Result<ContentLocation, ConfigError> {
        if self.remote {
            return Ok(ContentLocation::Remote {
                base_url: self.remote_url.clone(),
                timeout: Duration::from_secs(self.remote_timeout_secs),
            });
        }
        match &self.oniontree {
            Some(path) => Ok(ContentLocation::Local(path.clone())),
            None => Err(ConfigError::Validation(
                "oniontree data not specified (use --oniontree <DIR> or --remote)".into(),
            )),
        }
    }

    /// Per-run context handed to the generator.
    pub fn context(&self, alerts: Alerts) -> GenerationContext {
        GenerationContext {
            target: self.target,
            version: self.otb_version.clone(),
            omit_tags: self.frontpage_omit_tags.iter().cloned().collect(),
            alerts,
        }
    }
}

/// Everything a generation run needs besides the index and templates.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub target: Target,
    /// Bookmarks/version label exposed to templates.
    pub version: String,
    /// Members of these tags are left off the frontpage listing.
    pub omit_tags: BTreeSet<String>,
    pub alerts: Alerts,
}

/// Split a comma-separated tag list, trimming blanks and dropping empty items.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(GeneratorConfig::default())
        .map_err(|e| ConfigError::Validation(format!("cannot serialize defaults: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GeneratorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GeneratorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the generator config, from `path` when given, else stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<GeneratorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# oniontree-html configuration
# ============================
# All settings are optional. Command-line flags override anything set here.
# Values shown below are the defaults. Unknown keys cause an error.

# Directory with the page templates (search.html, api.html, download.html,
# service.html, services.html, tag.html, tags.html). Required to build.
# templates = "templates"

# Local checkout of the repository (unsorted/ and tagged/ directories).
# oniontree = "oniontree"

# Output root. Generated pages land in services/, tags/ and keys/ below it.
output = "."

# Read the hosted repository through its contents API instead of a checkout.
remote = false
remote_url = "https://api.github.com/repos/onionltd/oniontree/contents"

# Per-request timeout for the hosted repository, in seconds.
remote_timeout_secs = 30

# Services tagged with any of these tags won't show on the frontpage.
# Their own pages are still generated.
frontpage_omit_tags = []

# YAML file with per-service alerts:
#   abc:
#     - level: warning
#       message: Mirror unreachable since March.
# alerts = "alerts.yaml"

# Output flavor: "clearnet" or "onion".
target = "clearnet"

# Bookmarks version label shown in generated pages.
otb_version = ""
"##
}
