//! Template rendering.
//!
//! Pages are rendered from a user-supplied template directory with
//! [minijinja](https://docs.rs/minijinja). Every template file below the
//! directory (symlinks followed) is registered once at startup under its
//! relative path (`service.html`, `partials/head.html`), so templates can
//! `{% include %}` and `{% extends %}` each other. Only files with a
//! [`TEMPLATE_EXTENSIONS`] suffix are templates; assets kept alongside them
//! (`favicon.ico`, `img/logo.png`) are ignored. A template that fails to
//! parse aborts the run before anything is written.
//!
//! Templates whose names end in `.html`, `.htm` or `.xml` are auto-escaped.
//!
//! ## Helpers
//!
//! | Name | Kind | Result |
//! |---|---|---|
//! | `to_upper` | filter | uppercased text |
//! | `nl2space` | filter | newlines replaced by spaces |
//! | `pgp_fingerprint` | filter | `0123 4567 89AB CDEF 0123  4567 89AB CDEF 0123 4567` |
//! | `get_target()` | function | `"clearnet"` or `"onion"` |
//! | `bookmarks_version()` | function | configured version label |
//! | `service_last_update(id)` | function | record timestamp, or `""` |
//!
//! Helpers only see the [`TemplateHelpers`] snapshot taken at load time.

use crate::config::Target;
use minijinja::{Environment, ErrorKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot read template directory {}: {source}", .path.display())]
    TemplateDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("cannot read template {}: {source}", .path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot load template '{name}': {source}")]
    TemplateLoad {
        name: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("cannot render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// File extensions loaded as templates.
pub const TEMPLATE_EXTENSIONS: [&str; 5] = ["html", "htm", "xml", "txt", "j2"];

/// Per-run values exposed to templates through helper functions.
#[derive(Debug, Clone, Default)]
pub struct TemplateHelpers {
    pub target: Target,
    pub version: String,
    /// Service id → last-update timestamp, for sources that know it.
    pub last_updates: BTreeMap<String, String>,
}

/// A loaded template set.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Load every template file below `dir`.
    pub fn load(dir: &Path, helpers: TemplateHelpers) -> Result<Self, RenderError> {
        let mut templates = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|source| RenderError::TemplateDir {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() || is_hidden(entry.path(), dir) {
                continue;
            }
            if !is_template(entry.path()) {
                tracing::debug!(path = %entry.path().display(), "Not a template, skipped");
                continue;
            }
            let content =
                fs::read_to_string(entry.path()).map_err(|source| RenderError::TemplateRead {
                    path: entry.path().to_path_buf(),
                    source,
                })?;
            templates.push((template_name(entry.path(), dir), content));
        }
        tracing::info!(dir = %dir.display(), count = templates.len(), "Load templates");
        Self::from_sources(templates, helpers)
    }

    /// Build a template set from `(name, source)` pairs.
    pub fn from_sources<I>(templates: I, helpers: TemplateHelpers) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env = Environment::new();
        register_helpers(&mut env, helpers);
        for (name, source) in templates {
            env.add_template_owned(name.clone(), source)
                .map_err(|source| RenderError::TemplateLoad { name, source })?;
        }
        Ok(Self { env })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Render `name` with `data` as its context.
    pub fn render<S: Serialize>(&self, name: &str, data: S) -> Result<String, RenderError> {
        let render_error = |source| RenderError::Render {
            name: name.to_string(),
            source,
        };
        self.env
            .get_template(name)
            .map_err(render_error)?
            .render(data)
            .map_err(render_error)
    }
}

/// Template name for a file: its path relative to `dir`, `/`-separated.
fn template_name(path: &Path, dir: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn is_hidden(path: &Path, dir: &Path) -> bool {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

fn register_helpers(env: &mut Environment<'static>, helpers: TemplateHelpers) {
    env.add_filter("to_upper", to_upper);
    env.add_filter("nl2space", nl2space);
    env.add_filter("pgp_fingerprint", |fingerprint: String| {
        format_pgp_fingerprint(&fingerprint)
            .map_err(|msg| minijinja::Error::new(ErrorKind::InvalidOperation, msg))
    });

    let target = helpers.target.as_str();
    env.add_function("get_target", move || target);

    let version = helpers.version;
    env.add_function("bookmarks_version", move || version.clone());

    let last_updates = helpers.last_updates;
    env.add_function("service_last_update", move |id: String| {
        last_updates.get(&id).cloned().unwrap_or_default()
    });
}

pub fn to_upper(value: String) -> String {
    value.to_uppercase()
}

pub fn nl2space(value: String) -> String {
    value.replace('\n', " ")
}

/// Group a 40-character hex fingerprint for display.
///
/// Five groups of four, a double space, five more groups of four:
/// `0123 4567 89AB CDEF 0123  4567 89AB CDEF 0123 4567`.
pub fn format_pgp_fingerprint(fingerprint: &str) -> Result<String, String> {
    if fingerprint.len() != 40 || !fingerprint.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!(
            "'{fingerprint}' is not a 40-character hex fingerprint"
        ));
    }
    let groups: Vec<&str> = (0..10).map(|i| &fingerprint[i * 4..i * 4 + 4]).collect();
    Ok(format!("{}  {}", groups[..5].join(" "), groups[5..].join(" ")))
}
