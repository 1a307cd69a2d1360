//! Centralized naming rules for repository entries and output files.
//!
//! Every identifier in the pipeline comes from a storage key: service ids from
//! `unsorted/{id}.yaml`, tag names from `tagged/{tag}/`, members from
//! `tagged/{tag}/{id}.yaml`. The same identifiers are then joined back into
//! output paths (`services/{id}.html`, `tags/{tag}.html`, `keys/{id}.txt`),
//! so they must be single, harmless path components.
//!
//! ## Alphabetic Buckets
//!
//! Index pages group entries by the first character of their display name,
//! uppercased:
//! - `"Alpha"` → `"A"`
//! - `"dark market"` → `"D"`
//! - `"ëxample"` → `"Ë"`
//! - `"1337 forum"` → `"1"`

/// File extension of stored service records.
pub const RECORD_EXTENSION: &str = "yaml";

/// Strip the storage-format suffix from an entry name.
///
/// Only the last extension is removed, mirroring how records are keyed:
/// - `"abc.yaml"` → `"abc"`
/// - `"abc"` → `"abc"`
/// - `"my.service.yaml"` → `"my.service"`
/// - `".hidden"` → `".hidden"` (a leading dot is not an extension)
pub fn strip_storage_suffix(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(pos) => &name[..pos],
    }
}

/// Storage file name for a service id (`abc` → `abc.yaml`).
pub fn record_file_name(id: &str) -> String {
    format!("{id}.{RECORD_EXTENSION}")
}

/// Whether a listing entry should be ignored (dotfiles such as `.gitkeep`).
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Whether `name` can be joined onto a directory without escaping it.
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Tag name whose page would land on the tag index (`tags/index.html`).
pub const RESERVED_TAG: &str = "index";

/// Alphabetic bucket key for a display name: its first non-whitespace
/// character, uppercased.
///
/// Returns `None` for a blank name. Records are validated at ingestion, so
/// the generator never sees one.
pub fn bucket_key(name: &str) -> Option<String> {
    name.trim_start()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_yaml_suffix() {
        assert_eq!(strip_storage_suffix("abc.yaml"), "abc");
    }

    #[test]
    fn keeps_name_without_suffix() {
        assert_eq!(strip_storage_suffix("abc"), "abc");
    }

    #[test]
    fn strips_only_last_extension() {
        assert_eq!(strip_storage_suffix("my.service.yaml"), "my.service");
    }

    #[test]
    fn leading_dot_is_not_an_extension() {
        assert_eq!(strip_storage_suffix(".hidden"), ".hidden");
    }

    #[test]
    fn record_file_name_appends_extension() {
        assert_eq!(record_file_name("abc"), "abc.yaml");
    }

    #[test]
    fn dotfiles_are_hidden() {
        assert!(is_hidden(".gitkeep"));
        assert!(!is_hidden("abc.yaml"));
    }

    #[test]
    fn safe_component_rules() {
        assert!(is_safe_component("abc"));
        assert!(is_safe_component("my.service"));
        assert!(!is_safe_component(""));
        assert!(!is_safe_component("."));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("a/b"));
        assert!(!is_safe_component("a\\b"));
    }

    #[test]
    fn bucket_is_uppercase_first_char() {
        assert_eq!(bucket_key("Alpha").as_deref(), Some("A"));
        assert_eq!(bucket_key("lima").as_deref(), Some("L"));
        assert_eq!(bucket_key("1337 forum").as_deref(), Some("1"));
    }

    #[test]
    fn bucket_handles_non_ascii() {
        assert_eq!(bucket_key("ëxample").as_deref(), Some("Ë"));
    }

    #[test]
    fn bucket_none_for_empty_name() {
        assert_eq!(bucket_key(""), None);
        assert_eq!(bucket_key("  "), None);
    }

    #[test]
    fn bucket_ignores_leading_whitespace() {
        assert_eq!(bucket_key(" Alpha").as_deref(), Some("A"));
        assert_eq!(bucket_key("\tlima").as_deref(), Some("L"));
    }
}
