//! Incoming request representation
//!
//! `AssetRequest` is the manager's view of one intercepted request. Hosts
//! build it from whatever transport they sit on; resolution only ever looks
//! at the method, the absolute URL, and the navigation flag.

use bytes::Bytes;
use http::Method;
use url::Url;

use crate::store::AssetKey;

/// How the requester intends to use the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// A top-level page load. Only these ever receive the offline page.
    Navigation,
    /// Everything else: stylesheets, scripts, images, fonts, data fetches
    Subresource,
}

impl RequestMode {
    pub fn name(&self) -> &'static str {
        match self {
            RequestMode::Navigation => "navigation",
            RequestMode::Subresource => "subresource",
        }
    }
}

/// One intercepted request
#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub method: Method,
    pub url: Url,
    /// Request headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Request body, forwarded untouched on bypass
    pub body: Option<Bytes>,
    pub mode: RequestMode,
}

impl AssetRequest {
    /// A plain GET subresource request
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: None,
            mode: RequestMode::Subresource,
        }
    }

    /// A GET page-navigation request
    pub fn navigation(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigation,
            ..Self::get(url)
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigation
    }

    /// Whether resolution applies at all.
    ///
    /// Only GET requests over http or https enter the strategy pipeline;
    /// everything else is handed back to the host untouched.
    pub fn is_interceptable(&self) -> bool {
        self.method == Method::GET && matches!(self.url.scheme(), "http" | "https")
    }

    /// The store key this request addresses
    pub fn key(&self) -> AssetKey {
        AssetKey::from_url(&self.url)
    }

    /// Case-insensitive request header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
