//! Site generation.
//!
//! Turns a [`SiteIndex`] into the publishable tree by rendering templates and
//! exporting data. One call regenerates everything; nothing is read back from
//! a previous run.
//!
//! ## Steps
//!
//! 1. Standalone pages: `search.html`, `api.html`, `download.html`, each only
//!    when the template set has it.
//! 2. Per service, in listing order: `services/{id}.html` from
//!    `service.html`, the JSON mirror `services/{id}.json`, and one
//!    `keys/{key}.txt` per public key.
//! 3. Frontpage: `index.html` from `services.html`, services bucketed by the
//!    first letter of their name. Members of an omitted tag are left out here
//!    but keep their step-2 files.
//! 4. Tag index: `tags/index.html` from `tags.html`, tag names bucketed.
//! 5. Per tag: `tags/{tag}.html` from `tag.html`, members bucketed.
//!
//! ## Template Data
//!
//! | Template | Context |
//! |---|---|
//! | `service.html` | `{id, tags, service, alerts}` |
//! | `services.html` | `{data: {letter: [{id, service}]}}` |
//! | `tags.html` | `{data: {letter: [tag name]}}` |
//! | `tag.html` | `{name, data: {letter: [{id, service}]}}` |
//!
//! Bucket maps are `BTreeMap`s and every list keeps listing order, so
//! identical input renders byte-identical output.

use crate::alerts::alerts_for;
use crate::config::GenerationContext;
use crate::index::SiteIndex;
use crate::naming;
use crate::render::{RenderError, Renderer};
use crate::types::{Alert, ServiceRecord};
use crate::writer::{OutputWriter, WriteError};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("cannot serialize service '{id}': {source}")]
    Json {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Pages rendered without data, written at the output root when present.
pub const STANDALONE_PAGES: [&str; 3] = ["search.html", "api.html", "download.html"];

/// What a generation run produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GenerateReport {
    pub services: usize,
    /// Ids left off the frontpage by tag omission.
    pub omitted: Vec<String>,
    pub keys: usize,
    pub tags: usize,
    /// Standalone pages with no template.
    pub skipped_pages: Vec<String>,
    /// Every file written, relative to the output root, in write order.
    pub written: Vec<String>,
}

#[derive(Serialize)]
struct ServiceEntry<'a> {
    id: &'a str,
    service: &'a ServiceRecord,
}

#[derive(Serialize)]
struct ServicePage<'a> {
    id: &'a str,
    tags: Vec<String>,
    service: &'a ServiceRecord,
    alerts: &'a [Alert],
}

#[derive(Serialize)]
struct Buckets<T> {
    data: BTreeMap<String, Vec<T>>,
}

#[derive(Serialize)]
struct TagPage<'a> {
    name: &'a str,
    data: BTreeMap<String, Vec<ServiceEntry<'a>>>,
}

/// Render and write the whole output tree.
pub fn generate(
    index: &SiteIndex,
    renderer: &Renderer,
    ctx: &GenerationContext,
    writer: &mut OutputWriter,
) -> Result<GenerateReport, GenerateError> {
    let first_write = writer.written().len();
    let mut report = GenerateReport::default();

    for dir in ["services", "tags", "keys"] {
        writer.ensure_dir(dir)?;
    }

    for page in STANDALONE_PAGES {
        if !renderer.has_template(page) {
            tracing::warn!(template = page, "Template missing, page skipped");
            report.skipped_pages.push(page.to_string());
            continue;
        }
        tracing::info!("Generate {page}");
        let html = renderer.render(page, ())?;
        writer.write_file(page, html)?;
    }

    for (id, service) in &index.services {
        report.keys += generate_service(index, renderer, ctx, writer, id, service)?;
        report.services += 1;
    }

    let mut frontpage = Vec::new();
    for (id, service) in &index.services {
        if index.tag_index.get(id).is_some_and(|tags| !tags.is_disjoint(&ctx.omit_tags)) {
            tracing::info!(id = %id, "Omitted from frontpage");
            report.omitted.push(id.clone());
            continue;
        }
        frontpage.push(ServiceEntry { id, service });
    }
    tracing::info!("Generate index.html");
    let html = renderer.render(
        "services.html",
        Buckets {
            data: bucket_services(frontpage),
        },
    )?;
    writer.write_file("index.html", html)?;

    tracing::info!("Generate tags/index.html");
    let html = renderer.render(
        "tags.html",
        Buckets {
            data: bucket_by(index.tags.iter().map(|t| t.name.as_str()), |name| {
                naming::bucket_key(name)
            }),
        },
    )?;
    writer.write_file("tags/index.html", html)?;

    for tag in &index.tags {
        tracing::info!("Generate tag: tags/{}.html", tag.name);
        let members = tag.members.iter().filter_map(|id| {
            index
                .service(id)
                .map(|service| ServiceEntry { id, service })
        });
        let html = renderer.render(
            "tag.html",
            TagPage {
                name: &tag.name,
                data: bucket_services(members),
            },
        )?;
        writer.write_file(&format!("tags/{}.html", tag.name), html)?;
        report.tags += 1;
    }

    report.written = writer.written()[first_write..].to_vec();
    Ok(report)
}

/// Page, JSON mirror and key exports of one service. Returns the key count.
fn generate_service(
    index: &SiteIndex,
    renderer: &Renderer,
    ctx: &GenerationContext,
    writer: &mut OutputWriter,
    id: &str,
    service: &ServiceRecord,
) -> Result<usize, GenerateError> {
    tracing::info!("Generate service: services/{id}.html");
    let html = renderer.render(
        "service.html",
        ServicePage {
            id,
            tags: index.tags_of(id),
            service,
            alerts: alerts_for(&ctx.alerts, id),
        },
    )?;
    writer.write_file(&format!("services/{id}.html"), html)?;

    let json = serde_json::to_string(service).map_err(|source| GenerateError::Json {
        id: id.to_string(),
        source,
    })?;
    writer.write_file(&format!("services/{id}.json"), json)?;

    let mut keys = 0;
    for key in &service.public_keys {
        // Validated at ingestion: every key has a safe export id.
        let Some(key_id) = key.export_id() else {
            continue;
        };
        tracing::info!("Generate key: keys/{key_id}.txt");
        writer.write_file(&format!("keys/{key_id}.txt"), &key.value)?;
        keys += 1;
    }
    Ok(keys)
}

fn bucket_services<'a, I>(entries: I) -> BTreeMap<String, Vec<ServiceEntry<'a>>>
where
    I: IntoIterator<Item = ServiceEntry<'a>>,
{
    bucket_by(entries, |entry| naming::bucket_key(&entry.service.name))
}

/// Group items under `key_of(item)`, keeping input order within each bucket.
fn bucket_by<T, I, F>(items: I, key_of: F) -> BTreeMap<String, Vec<T>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Option<String>,
{
    let mut buckets: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        if let Some(key) = key_of(&item) {
            buckets.entry(key).or_default().push(item);
        }
    }
    buckets
}
