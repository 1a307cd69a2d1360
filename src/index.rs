//! In-memory index of the repository.
//!
//! Built once per run from a [`ContentSource`], then read-only. Holds every
//! service record, every tag with its members, and the inverse relation
//! (service id → tag names), computed in a single pass over the tags.
//!
//! ## Invariants
//!
//! - Every service id has a [`SiteIndex::tag_index`] entry, empty when the
//!   service carries no tag.
//! - `tag ∈ tag_index[id]` exactly when `id ∈ tag.members`.
//! - A tag that references an id absent from the service listing is an
//!   error, never silently dropped.
//! - No tag is named [`naming::RESERVED_TAG`].

use crate::naming;
use crate::source::{ContentSource, SourceError};
use crate::types::{ServiceRecord, Tag};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug)]
pub struct SiteIndex {
    /// `(id, record)` in source-listing order.
    pub services: Vec<(String, ServiceRecord)>,
    /// Tags in source-listing order, members in listing order.
    pub tags: Vec<Tag>,
    /// Service id → names of the tags referencing it.
    pub tag_index: BTreeMap<String, BTreeSet<String>>,
    positions: HashMap<String, usize>,
}

impl SiteIndex {
    /// Look up a service record by id.
    pub fn service(&self, id: &str) -> Option<&ServiceRecord> {
        self.positions.get(id).map(|&pos| &self.services[pos].1)
    }

    /// Look up a tag by name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Sorted tag names of a service; empty for unknown ids.
    pub fn tags_of(&self, id: &str) -> Vec<String> {
        self.tag_index
            .get(id)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Last-update timestamps of every indexed service the source can date.
    pub fn last_updates(&self, source: &dyn ContentSource) -> BTreeMap<String, String> {
        self.services
            .iter()
            .filter_map(|(id, _)| source.service_last_update(id).map(|ts| (id.clone(), ts)))
            .collect()
    }

    pub fn key_count(&self) -> usize {
        self.services
            .iter()
            .map(|(_, record)| record.public_keys.len())
            .sum()
    }
}

/// Read the whole repository and invert tag membership.
///
/// Fails on the first listing, fetch or decode error.
pub fn build_index(source: &dyn ContentSource) -> Result<SiteIndex, SourceError> {
    let ids = source.list_service_ids()?;

    let mut services = Vec::with_capacity(ids.len());
    let mut positions = HashMap::with_capacity(ids.len());
    let mut tag_index = BTreeMap::new();
    for id in ids {
        tracing::debug!(id = %id, "Load service");
        let record = source.get_service(&id)?;
        positions.insert(id.clone(), services.len());
        tag_index.insert(id.clone(), BTreeSet::new());
        services.push((id, record));
    }

    let mut tags = Vec::new();
    for name in source.list_tags()? {
        if name == naming::RESERVED_TAG {
            return Err(SourceError::decode(
                name,
                "tag name is reserved for the tag index page",
            ));
        }
        let members = source.list_tag_members(&name)?;
        for member in &members {
            let Some(tag_set) = tag_index.get_mut(member) else {
                return Err(SourceError::NotFound(format!(
                    "service '{member}' referenced by tag '{name}'"
                )));
            };
            tag_set.insert(name.clone());
        }
        tags.push(Tag { name, members });
    }

    tracing::info!(
        services = services.len(),
        tags = tags.len(),
        "Indexed repository"
    );

    Ok(SiteIndex {
        services,
        tags,
        tag_index,
        positions,
    })
}
