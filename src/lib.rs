//! # oniontree-html
//!
//! Static site generator for an OnionTree repository: a version-controlled
//! catalog of hidden services, one YAML record per service plus tag
//! directories. Every run reads the whole repository and rewrites the whole
//! publishable tree (HTML pages, JSON mirrors, public key exports, tag
//! indexes).
//!
//! # Pipeline
//!
//! ```text
//! 1. Source    checkout / contents API  →  records + tag listings
//! 2. Index     records + listings       →  SiteIndex (tag ↔ service both ways)
//! 3. Generate  SiteIndex + templates    →  output tree
//! ```
//!
//! The source is read through one trait, so a local checkout and the hosted
//! repository produce the same index. Generation is a pure function of the
//! index, the template directory and a [`config::GenerationContext`]:
//! identical input yields a byte-identical tree.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | `ContentSource` trait with local checkout and remote API backends |
//! | [`index`] | Stage 2: loads every record and inverts tag membership |
//! | [`render`] | minijinja template set and the helpers exposed to templates |
//! | [`generate`] | Stage 3: renders and writes every page, mirror and key export |
//! | [`writer`] | Output tree writes, recorded for the run summary |
//! | [`config`] | `config.toml` loading, merging with defaults and CLI overrides |
//! | [`alerts`] | Optional per-service alerts file |
//! | [`types`] | Shared data model (`ServiceRecord`, `PublicKey`, `Tag`) |
//! | [`naming`] | Storage-key → identifier rules, path safety, bucket keys |
//! | [`output`] | CLI output formatting for `check` and `build` |
//!
//! # Output Layout
//!
//! ```text
//! index.html                 services bucketed by initial
//! search.html api.html download.html
//! services/{id}.html         one page per service
//! services/{id}.json         record mirror
//! tags/index.html            tag names bucketed by initial
//! tags/{tag}.html            members of one tag
//! keys/{key}.txt             armored public key, verbatim
//! ```
//!
//! The output directory is a build artifact. A failed run leaves it in an
//! unspecified state; rerun to rebuild it.

pub mod alerts;
pub mod config;
pub mod generate;
pub mod index;
pub mod naming;
pub mod output;
pub mod render;
pub mod source;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;

/// Install the stderr log subscriber.
///
/// `verbose` maps to the default level (0 = warn, 1 = info, 2 = debug,
/// 3+ = trace); `RUST_LOG` directives are honoured on top.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
