//! # Request Module
//!
//! The narrow interface through which the pipeline reads a request.
//!
//! The pipeline never touches a framework request directly. It asks a [`RequestSource`]
//! for the raw query multi-map, the raw form multi-map, the parsed JSON body and the
//! declared content type. [`RawRequest`] is the owned implementation used by the HTTP
//! adapter and by tests.

mod multipart;
mod raw;

pub use multipart::{parse_boundary, parse_text_fields};
pub use raw::{parse_query_string, RawRequest};

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Ordered multi-valued mapping as delivered by query-string and form parsers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    pairs: Vec<(String, String)>,
}

impl MultiMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Last value supplied for `key` ("last write wins").
    #[must_use]
    pub fn get_last(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rfind(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value supplied for `key`, in original order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct keys in order of first appearance.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (k, _) in &self.pairs {
            if !keys.contains(&k.as_str()) {
                keys.push(k.as_str());
            }
        }
        keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Options for reading the JSON body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    /// Parse failures and a missing JSON body yield "no body" instead of an error
    pub silent: bool,
    /// Parse the body even when the content type does not announce JSON
    pub force: bool,
}

impl JsonOptions {
    #[must_use]
    pub fn silent() -> Self {
        Self {
            silent: true,
            force: false,
        }
    }
}

/// The body announced JSON but could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonParseError {
    pub detail: String,
}

impl fmt::Display for JsonParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to decode JSON object: {}", self.detail)
    }
}

impl std::error::Error for JsonParseError {}

/// Framework-facing accessors the pipeline depends on.
pub trait RequestSource {
    /// Query string as a multi-map.
    fn raw_query(&self) -> &MultiMap;

    /// Form fields, or `None` when the request carries no form payload.
    fn raw_form(&self) -> Option<&MultiMap>;

    /// Parsed JSON body.
    ///
    /// `Ok(None)` when the request does not carry JSON (or `silent` swallowed a failure);
    /// `Err` when the body announced JSON but is malformed.
    fn json_body(&self, options: &JsonOptions) -> Result<Option<Value>, JsonParseError>;

    /// Declared `Content-Type` header, verbatim.
    fn content_type(&self) -> Option<&str>;
}

/// Media type of a `Content-Type` value: lowercased, parameters stripped.
#[must_use]
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Whether a media type denotes JSON (`application/json` or a `+json` suffix).
#[must_use]
pub fn is_json_media_type(media: &str) -> bool {
    media == "application/json" || (media.starts_with("application/") && media.ends_with("+json"))
}
