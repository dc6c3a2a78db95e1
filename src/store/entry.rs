//! Asset key and stored response types
//!
//! This module defines the core storage structures:
//! - `AssetKey`: Unique identifier for stored assets (absolute URL, fragment stripped)
//! - `AssetResponse`: A complete response snapshot (status + headers + body) with metadata

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use url::Url;

/// Key identifying a stored asset.
///
/// Two requests address the same entry when their absolute URLs match after
/// the fragment is dropped. The query string is part of the identity.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetKey(String);

impl AssetKey {
    /// Build a key from an absolute URL, discarding any fragment
    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        AssetKey(url.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AssetKey {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s)?;
        Ok(AssetKey::from_url(&url))
    }
}

/// A complete response snapshot held by a store.
///
/// Bodies are buffered in full; there is no streaming representation. The
/// same type describes responses fresh off the network and copies replayed
/// from a store, so strategy code never converts between shapes.
#[derive(Debug, Clone)]
pub struct AssetResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// The full response body
    pub body: Bytes,
    /// When this snapshot was taken
    pub created_at: SystemTime,
}

impl AssetResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            created_at: SystemTime::now(),
        }
    }

    /// True for 2xx statuses. Only successful responses are ever stored.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Case-insensitive header lookup, first match wins
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Approximate size of this snapshot in bytes, for store accounting
    pub fn size_bytes(&self) -> usize {
        let header_size: usize = self.headers.iter().map(|(k, v)| k.len() + v.len()).sum();
        self.body.len() + header_size + std::mem::size_of::<u16>() + std::mem::size_of::<SystemTime>()
    }
}
