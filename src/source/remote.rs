//! Content source backed by a hosted repository contents API.
//!
//! The API mirrors the checkout layout. Directory requests return a JSON
//! array of entries, file requests return an envelope carrying the file
//! base64-encoded:
//!
//! ```text
//! GET {base}/unsorted            → [{"name": "abc.yaml", "type": "file"}, ...]
//! GET {base}/tagged              → [{"name": "news", "type": "dir"}, ...]
//! GET {base}/tagged/news         → [{"name": "abc.yaml", ...}, ...]
//! GET {base}/unsorted/abc.yaml   → {"content": "bmFtZTogQWxwaGEK\n...", ...}
//! ```
//!
//! Every call is a single blocking request with the configured timeout. There
//! are no retries: a 404 is [`SourceError::NotFound`], any other failure
//! status, connection error or timeout is [`SourceError::Transport`], and
//! a payload that does not decode is [`SourceError::Decode`].

use super::{ContentSource, SourceError, decode_record, listing_ids};
use crate::naming;
use crate::types::ServiceRecord;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com/repos/onionltd/oniontree/contents";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("oniontree-html/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct RemoteSource {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl RemoteSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn fetch(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SourceError::Transport(format!("GET {url}: {e}")))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url));
        }
        if !status.is_success() {
            return Err(SourceError::Transport(format!(
                "GET {url}: invalid API response code {}",
                status.as_u16()
            )));
        }
        let body = resp
            .bytes()
            .map_err(|e| SourceError::Transport(format!("GET {url}: {e}")))?;
        Ok(body.to_vec())
    }
}

/// Entry names of a directory listing, optionally only directories.
fn parse_listing(what: &str, body: &[u8], dirs_only: bool) -> Result<Vec<String>, SourceError> {
    let entries: Vec<ListingEntry> =
        serde_json::from_slice(body).map_err(|e| SourceError::decode(what, e))?;
    Ok(entries
        .into_iter()
        .filter(|e| !dirs_only || e.kind.as_deref().is_none_or(|k| k == "dir"))
        .map(|e| e.name)
        .collect())
}

/// Extract and base64-decode the `content` field of a file envelope.
///
/// The API wraps base64 at 60 columns, so all whitespace (and escaped `\n`
/// sequences some proxies leave behind) is removed before decoding.
fn decode_envelope(id: &str, body: &[u8]) -> Result<Vec<u8>, SourceError> {
    let envelope: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| SourceError::decode(id, e))?;
    let content = envelope
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| SourceError::decode(id, "content field not defined"))?;
    let compact: String = content
        .replace("\\n", "")
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| SourceError::decode(id, e))
}

impl ContentSource for RemoteSource {
    fn list_service_ids(&self) -> Result<Vec<String>, SourceError> {
        let body = self.fetch("unsorted")?;
        listing_ids(parse_listing("unsorted", &body, false)?, true)
    }

    fn get_service(&self, id: &str) -> Result<ServiceRecord, SourceError> {
        if !naming::is_safe_component(id) {
            return Err(SourceError::NotFound(format!("service '{id}'")));
        }
        let body = self.fetch(&format!("unsorted/{}", naming::record_file_name(id)))?;
        let content = decode_envelope(id, &body)?;
        decode_record(id, &content)
    }

    fn list_tags(&self) -> Result<Vec<String>, SourceError> {
        let body = self.fetch("tagged")?;
        listing_ids(parse_listing("tagged", &body, true)?, false)
    }

    fn list_tag_members(&self, tag: &str) -> Result<Vec<String>, SourceError> {
        if !naming::is_safe_component(tag) {
            return Err(SourceError::NotFound(format!("tag '{tag}'")));
        }
        let body = self.fetch(&format!("tagged/{tag}"))?;
        listing_ids(parse_listing(tag, &body, false)?, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    /// Serve canned `(status, body)` responses keyed by request path on a
    /// loopback port. Unknown paths get a 404. Returns the base URL.
    fn serve(routes: Vec<(&str, u16, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: HashMap<String, (u16, String)> = routes
            .into_iter()
            .map(|(path, status, body)| (path.to_string(), (status, body)))
            .collect();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = routes
                    .get(path)
                    .cloned()
                    .unwrap_or((404, r#"{"message":"Not Found"}"#.to_string()));
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        format!("http://{addr}/contents")
    }

    fn envelope(yaml: &str) -> String {
        let encoded = STANDARD.encode(yaml);
        // Wrap like the hosted API does.
        let wrapped: Vec<String> = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect();
        serde_json::json!({ "name": "x.yaml", "content": wrapped.join("\n") }).to_string()
    }

    fn source(base: &str) -> RemoteSource {
        RemoteSource::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let s = source("http://127.0.0.1:1/contents/");
        assert_eq!(s.base_url(), "http://127.0.0.1:1/contents");
        assert_eq!(s.url("unsorted"), "http://127.0.0.1:1/contents/unsorted");
    }

    #[test]
    fn listing_parses_names() {
        let body = br#"[{"name":"abc.yaml","type":"file","sha":"x"},{"name":"dread.yaml"}]"#;
        assert_eq!(
            parse_listing("unsorted", body, false).unwrap(),
            vec!["abc.yaml", "dread.yaml"]
        );
    }

    #[test]
    fn listing_dirs_only_skips_files() {
        let body = br#"[{"name":"news","type":"dir"},{"name":"README.md","type":"file"}]"#;
        assert_eq!(parse_listing("tagged", body, true).unwrap(), vec!["news"]);
    }

    #[test]
    fn listing_rejects_non_array() {
        let result = parse_listing("unsorted", br#"{"message":"rate limited"}"#, false);
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn envelope_decodes_wrapped_base64() {
        let yaml = "name: Alpha\nurls:\n  - http://alpha.onion\ndescription: a fairly long description to force wrapping\n";
        let body = envelope(yaml);
        assert_eq!(decode_envelope("abc", body.as_bytes()).unwrap(), yaml.as_bytes());
    }

    #[test]
    fn envelope_tolerates_escaped_newlines() {
        let body = r#"{"content":"bmFtZTog\\nQWxwaGEK"}"#;
        assert_eq!(decode_envelope("abc", body.as_bytes()).unwrap(), b"name: Alpha\n");
    }

    #[test]
    fn envelope_without_content_is_decode_error() {
        let result = decode_envelope("abc", br#"{"name":"abc.yaml"}"#);
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn envelope_with_non_string_content_is_decode_error() {
        let result = decode_envelope("abc", br#"{"content":42}"#);
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn envelope_with_bad_base64_is_decode_error() {
        let result = decode_envelope("abc", br#"{"content":"***"}"#);
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn fetches_listing_and_records_over_http() {
        let base = serve(vec![
            (
                "/contents/unsorted",
                200,
                r#"[{"name":"abc.yaml","type":"file"}]"#.to_string(),
            ),
            ("/contents/unsorted/abc.yaml", 200, envelope("name: Alpha\n")),
            (
                "/contents/tagged",
                200,
                r#"[{"name":"news","type":"dir"}]"#.to_string(),
            ),
            (
                "/contents/tagged/news",
                200,
                r#"[{"name":"abc.yaml","type":"symlink"}]"#.to_string(),
            ),
        ]);
        let s = source(&base);
        assert_eq!(s.list_service_ids().unwrap(), vec!["abc"]);
        assert_eq!(s.get_service("abc").unwrap().name, "Alpha");
        assert_eq!(s.list_tags().unwrap(), vec!["news"]);
        assert_eq!(s.list_tag_members("news").unwrap(), vec!["abc"]);
        assert_eq!(s.service_last_update("abc"), None);
    }

    #[test]
    fn http_404_is_not_found() {
        let base = serve(vec![]);
        assert!(matches!(
            source(&base).get_service("missing"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn http_error_status_is_transport_error() {
        let base = serve(vec![(
            "/contents/unsorted",
            403,
            r#"{"message":"API rate limit exceeded"}"#.to_string(),
        )]);
        let err = source(&base).list_service_ids().unwrap_err();
        match err {
            SourceError::Transport(msg) => assert!(msg.contains("403")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn connection_refused_is_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let s = source(&format!("http://127.0.0.1:{port}/contents"));
        assert!(matches!(
            s.list_tags(),
            Err(SourceError::Transport(_))
        ));
    }
}
