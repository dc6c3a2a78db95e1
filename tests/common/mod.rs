// Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use cachette::config::{Config, RulesConfig};
use cachette::fetch::{FetchError, Fetcher};
use cachette::request::AssetRequest;
use cachette::store::AssetResponse;

/// Fetcher serving canned responses by exact URL. URLs without a route
/// fail the way an unreachable network does.
pub struct StubFetcher {
    routes: HashMap<String, (u16, &'static str, &'static str)>,
    calls: AtomicU64,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn route(mut self, url: &str, status: u16, content_type: &'static str, body: &'static str) -> Self {
        self.routes.insert(url.to_string(), (status, content_type, body));
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.routes.get(request.url.as_str()) {
            Some((status, content_type, body)) => Ok(AssetResponse::new(
                *status,
                vec![("content-type".to_string(), content_type.to_string())],
                Bytes::from_static(body.as_bytes()),
            )),
            None => Err(FetchError::Unavailable(request.url.to_string())),
        }
    }
}

/// A dashboard-shaped config: an app shell, a stylesheet, an icon, and a
/// third-party font, with one rule group per strategy.
pub fn dashboard_config(version: &str) -> Config {
    Config {
        version: version.to_string(),
        store_prefix: "cachette".to_string(),
        origin: "https://dashboard.example.org".to_string(),
        precache: vec![
            "/".to_string(),
            "/styles.css".to_string(),
            "/icon.png".to_string(),
            "https://fonts.example.com/inter.woff2".to_string(),
        ],
        rules: RulesConfig {
            network_first: vec![r"/$".to_string(), r"\.html$".to_string()],
            cache_first: vec![r"\.(?:css|woff2)$".to_string()],
            stale_while_revalidate: vec![r"\.png$".to_string()],
        },
        gateway: Default::default(),
    }
}

/// Routes matching every entry in [`dashboard_config`]'s manifest
pub fn dashboard_fetcher() -> StubFetcher {
    StubFetcher::new()
        .route(
            "https://dashboard.example.org/",
            200,
            "text/html",
            "<html>shell</html>",
        )
        .route(
            "https://dashboard.example.org/styles.css",
            200,
            "text/css",
            "body { margin: 0 }",
        )
        .route(
            "https://dashboard.example.org/icon.png",
            200,
            "image/png",
            "png-bytes",
        )
        .route(
            "https://fonts.example.com/inter.woff2",
            200,
            "font/woff2",
            "woff2-bytes",
        )
}
