//! CLI output formatting for `check` and `build`.
//!
//! Output is an inventory of the repository and of the generated tree. Each
//! entity gets a header line (positional index + display name) followed by
//! indented context lines.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Services
//! 001 Alpha (abc)
//!     Tags: news
//!     Keys: 89ABCDEF01234567
//!     Independent news outlet. Mirrors updated daily.
//! 002 Echo (echo)
//!
//! Tags
//! 001 news (2 services)
//!     abc, lima
//!
//! Indexed 2 services, 1 tag, 1 key
//! ```
//!
//! ## Build
//!
//! ```text
//! Pages
//!     index.html
//!     search.html
//! Services
//!     services/abc.html
//!     services/abc.json
//! Keys
//!     keys/89ABCDEF01234567.txt
//! Tags
//!     tags/index.html
//!     tags/news.html
//!
//! Skipped api.html (no template)
//! Omitted from frontpage: scammy
//!
//! Generated 2 services, 1 key, 1 tag
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::generate::GenerateReport;
use crate::index::SiteIndex;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// `1 key`, `3 keys`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Collapse whitespace and truncate to `max` characters, appending `...`.
fn truncate_desc(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// check
// ============================================================================

/// Format the repository inventory printed by `check`.
pub fn format_index_output(index: &SiteIndex) -> Vec<String> {
    let mut lines = vec!["Services".to_string()];
    for (i, (id, service)) in index.services.iter().enumerate() {
        lines.push(format!("{} {} ({})", format_index(i + 1), service.name, id));
        let tags = index.tags_of(id);
        if !tags.is_empty() {
            lines.push(format!("    Tags: {}", tags.join(", ")));
        }
        let keys: Vec<&str> = service
            .public_keys
            .iter()
            .filter_map(|k| k.export_id())
            .collect();
        if !keys.is_empty() {
            lines.push(format!("    Keys: {}", keys.join(", ")));
        }
        let desc = truncate_desc(&service.description, 60);
        if !desc.is_empty() {
            lines.push(format!("    {desc}"));
        }
    }

    if !index.tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for (i, tag) in index.tags.iter().enumerate() {
            lines.push(format!(
                "{} {} ({})",
                format_index(i + 1),
                tag.name,
                plural(tag.members.len(), "service")
            ));
            if !tag.members.is_empty() {
                lines.push(format!("    {}", tag.members.join(", ")));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Indexed {}, {}, {}",
        plural(index.services.len(), "service"),
        plural(index.tags.len(), "tag"),
        plural(index.key_count(), "key")
    ));
    lines
}

pub fn print_index_output(index: &SiteIndex) {
    for line in format_index_output(index) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Section heading for a written path, by its top-level directory.
fn section_of(path: &str) -> &'static str {
    match path.split_once('/') {
        None => "Pages",
        Some(("services", _)) => "Services",
        Some(("keys", _)) => "Keys",
        Some(("tags", _)) => "Tags",
        Some(_) => "Other",
    }
}

/// Format the generated tree and run totals printed by `build`.
pub fn format_generate_output(report: &GenerateReport) -> Vec<String> {
    let mut lines = Vec::new();
    for section in ["Pages", "Services", "Keys", "Tags", "Other"] {
        let mut paths: Vec<&str> = report
            .written
            .iter()
            .map(String::as_str)
            .filter(|p| section_of(p) == section)
            .collect();
        if paths.is_empty() {
            continue;
        }
        paths.sort_unstable();
        paths.dedup();
        lines.push(section.to_string());
        lines.extend(paths.into_iter().map(|p| format!("    {p}")));
    }

    if !report.skipped_pages.is_empty() || !report.omitted.is_empty() {
        lines.push(String::new());
    }
    for page in &report.skipped_pages {
        lines.push(format!("Skipped {page} (no template)"));
    }
    if !report.omitted.is_empty() {
        lines.push(format!(
            "Omitted from frontpage: {}",
            report.omitted.join(", ")
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Generated {}, {}, {}",
        plural(report.services, "service"),
        plural(report.keys, "key"),
        plural(report.tags, "tag")
    ));
    lines
}

pub fn print_generate_output(report: &GenerateReport) {
    for line in format_generate_output(report) {
        println!("{}", line);
    }
}
