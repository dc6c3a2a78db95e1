//! Network fetching
//!
//! The `Fetcher` trait is the only path to the network. Strategy code
//! depends on the trait rather than a concrete client, which keeps
//! resolution testable with scripted fetchers and keeps the HTTP stack
//! swappable.
//!
//! A fetch succeeds whenever a complete response arrives, whatever its
//! status code. Callers decide what a 404 means; only transport problems
//! (DNS, connect, timeout, interrupted body) are errors here.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::request::AssetRequest;
use crate::store::AssetResponse;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    /// Catch-all for fetchers not backed by reqwest
    #[error("network unavailable: {0}")]
    Unavailable(String),
}

/// Network access seam
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request and buffer the complete response
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError>;
}

/// Fetcher backed by a shared reqwest client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("cachette/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError> {
        let scheme = request.url.scheme();
        if !matches!(scheme, "http" | "https") {
            return Err(FetchError::UnsupportedScheme(scheme.to_string()));
        }

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(forwardable_headers(&request.headers));

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(AssetResponse::new(status, headers, body))
    }
}

/// Convert loose header pairs into a HeaderMap, dropping anything that does
/// not parse and the host header (the client derives it from the URL).
fn forwardable_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("host") {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => {
                tracing::warn!(header = %name, "dropping malformed request header");
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use url::Url;

    #[test]
    fn test_can_construct_http_fetcher() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[test]
    fn test_fetcher_trait_is_object_safe() {
        fn _take_dyn(_fetcher: &dyn Fetcher) {}
    }

    #[tokio::test]
    async fn test_non_http_scheme_is_rejected() {
        let fetcher = HttpFetcher::new().unwrap();
        let request = AssetRequest::get(
            Url::parse("chrome-extension://abcdef/content.js").unwrap(),
        );

        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(_)));
        assert!(err.to_string().contains("chrome-extension"));
    }

    #[test]
    fn test_forwardable_headers_drops_host_and_malformed_pairs() {
        let headers = vec![
            ("Host".to_string(), "example.org".to_string()),
            ("Accept".to_string(), "text/html".to_string()),
            ("Bad Name".to_string(), "x".to_string()),
            ("X-Newline".to_string(), "a\nb".to_string()),
        ];

        let map = forwardable_headers(&headers);

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("accept").unwrap(), "text/html");
    }

    #[test]
    fn test_repeated_headers_are_all_kept() {
        let headers = vec![
            ("Accept-Language".to_string(), "fr".to_string()),
            ("Accept-Language".to_string(), "en".to_string()),
        ];

        let map = forwardable_headers(&headers);

        assert_eq!(map.get_all("accept-language").iter().count(), 2);
    }

    // Scripted fetcher showing the trait seam the strategies rely on
    struct ScriptedFetcher {
        body: &'static str,
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, _request: &AssetRequest) -> Result<AssetResponse, FetchError> {
            Ok(AssetResponse::new(200, vec![], Bytes::from(self.body)))
        }
    }

    #[tokio::test]
    async fn test_scripted_fetcher_satisfies_the_trait() {
        let fetcher: Box<dyn Fetcher> = Box::new(ScriptedFetcher { body: "payload" });
        let request = AssetRequest::get(Url::parse("https://example.org/x").unwrap());

        let response = fetcher.fetch(&request).await.unwrap();
        assert_eq!(response.body, Bytes::from("payload"));
    }
}
