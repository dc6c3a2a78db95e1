//! Local HTTP gateway
//!
//! The gateway is the host embedding: it listens on a local socket, turns
//! inbound HTTP into [`AssetRequest`]s, and serves whatever the manager
//! resolves. Requests the manager declines (`Bypass`) are forwarded to the
//! network verbatim.
//!
//! A small admin surface rides on the same listener:
//!
//! - `POST /admin/message` accepts a control command as JSON and returns
//!   the reply
//! - `GET /admin/version` reports the running version tag
//! - `GET /admin/stats` reports lifecycle state and store counters

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use url::Url;

use crate::fetch::Fetcher;
use crate::manager::{Command, CommandReply, ControlMessage, LifecycleEvent, Manager, Resolution};
use crate::request::{AssetRequest, RequestMode};
use crate::store::{AssetResponse, StoreStats};

/// Response header naming where the answer came from (`store`, `network`,
/// `offline`). Bypassed requests do not carry it.
pub const SOURCE_HEADER: &str = "x-cachette-source";

/// Cap on buffered request bodies. Interceptable traffic is GET, so
/// anything near this limit is already a bypass candidate.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Response headers never replayed to clients. Hop-by-hop fields describe
/// the upstream connection, not this one, and content-length is recomputed
/// from the body we actually send.
const SKIPPED_RESPONSE_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Manager>,
    pub fetcher: Arc<dyn Fetcher>,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    version: String,
    state: String,
    store: StoreStats,
}

/// Build the gateway router. Admin routes are matched first; everything
/// else falls through to resolution.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/admin/message", post(admin_message))
        .route("/admin/version", get(admin_version))
        .route("/admin/stats", get(admin_stats))
        .fallback(proxy_asset)
        .with_state(state)
}

/// Serve the gateway on an already-bound listener until the process exits.
pub async fn serve(
    listener: TcpListener,
    manager: Arc<Manager>,
    fetcher: Arc<dyn Fetcher>,
) -> std::io::Result<()> {
    spawn_event_logger(&manager);
    let app = router(AppState { manager, fetcher });
    axum::serve(listener, app).await
}

/// Log lifecycle broadcasts for as long as the manager lives
fn spawn_event_logger(manager: &Arc<Manager>) {
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LifecycleEvent::Updated { version }) => {
                    tracing::info!(version = %version, "new version took control");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "lifecycle event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

// ============================================================================
// Admin handlers
// ============================================================================

async fn admin_message(State(state): State<AppState>, body: Bytes) -> Response {
    let command: Command = match serde_json::from_slice(&body) {
        Ok(command) => command,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid control message: {}", err),
            );
        }
    };

    let (message, reply) = ControlMessage::new(command);
    state.manager.handle_message(message).await;

    match reply.await {
        Ok(reply) => Json(reply).into_response(),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "command dropped without a reply",
        ),
    }
}

async fn admin_version(State(state): State<AppState>) -> Json<CommandReply> {
    Json(CommandReply::version(state.manager.version()))
}

async fn admin_stats(State(state): State<AppState>) -> Json<StatsReport> {
    Json(StatsReport {
        version: state.manager.version().to_string(),
        state: state.manager.state().name().to_string(),
        store: state.manager.store_stats().await,
    })
}

// ============================================================================
// Asset handler
// ============================================================================

async fn proxy_asset(State(state): State<AppState>, request: axum::extract::Request) -> Response {
    let asset_request = match into_asset_request(state.manager.origin(), request).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.manager.resolve(asset_request).await {
        Ok(Resolution::Answered(resolved)) => {
            to_http_response(resolved.response, Some(resolved.source.name()))
        }
        Ok(Resolution::Bypass(original)) => match state.fetcher.fetch(&original).await {
            Ok(response) => to_http_response(response, None),
            Err(err) => {
                tracing::warn!(url = %original.url, error = %err, "bypass fetch failed");
                error_response(
                    StatusCode::BAD_GATEWAY,
                    &format!("upstream fetch failed: {}", err),
                )
            }
        },
        Err(err) => error_response(StatusCode::BAD_GATEWAY, &err.to_string()),
    }
}

/// Turn an inbound HTTP request into an [`AssetRequest`], resolving
/// origin-form paths against the configured origin
async fn into_asset_request(
    origin: &Url,
    request: axum::extract::Request,
) -> Result<AssetRequest, Response> {
    let (parts, body) = request.into_parts();

    let url = match absolute_url(origin, &parts.uri) {
        Ok(url) => url,
        Err(reason) => return Err(error_response(StatusCode::BAD_REQUEST, &reason)),
    };

    let mode = request_mode(&parts.headers);

    let mut headers = Vec::new();
    for (name, value) in &parts.headers {
        if name == http::header::HOST {
            continue;
        }
        if let Ok(value) = value.to_str() {
            headers.push((name.as_str().to_string(), value.to_string()));
        }
    }

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                &format!("failed to read request body: {}", err),
            ));
        }
    };
    let body = if body.is_empty() { None } else { Some(body) };

    Ok(AssetRequest {
        method: parts.method,
        url,
        headers,
        body,
        mode,
    })
}

/// Absolute-form URIs pass through; origin-form paths join the origin
fn absolute_url(origin: &Url, uri: &Uri) -> Result<Url, String> {
    if uri.scheme().is_some() {
        return Url::parse(&uri.to_string())
            .map_err(|e| format!("invalid request URI '{}': {}", uri, e));
    }

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    origin
        .join(path_and_query)
        .map_err(|e| format!("request path '{}' does not resolve: {}", path_and_query, e))
}

/// Navigation detection. `Sec-Fetch-Mode` is authoritative when present;
/// otherwise an Accept header asking for HTML marks a navigation.
fn request_mode(headers: &HeaderMap) -> RequestMode {
    if let Some(mode) = headers.get("sec-fetch-mode").and_then(|v| v.to_str().ok()) {
        if mode.eq_ignore_ascii_case("navigate") {
            return RequestMode::Navigation;
        }
        return RequestMode::Subresource;
    }

    let accepts_html = headers
        .get(http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false);

    if accepts_html {
        RequestMode::Navigation
    } else {
        RequestMode::Subresource
    }
}

fn to_http_response(asset: AssetResponse, source: Option<&'static str>) -> Response {
    let status = StatusCode::from_u16(asset.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut response = Response::new(Body::from(asset.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in &asset.headers {
        if SKIPPED_RESPONSE_HEADERS
            .iter()
            .any(|skip| name.eq_ignore_ascii_case(skip))
        {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        headers.append(name, value);
    }

    if let Some(source) = source {
        headers.insert(
            HeaderName::from_static(SOURCE_HEADER),
            HeaderValue::from_static(source),
        );
    }

    response
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://dashboard.example.org").unwrap()
    }

    #[test]
    fn test_origin_form_paths_join_the_origin() {
        let uri: Uri = "/reports/q3.html?draft=1".parse().unwrap();
        let url = absolute_url(&origin(), &uri).unwrap();
        assert_eq!(
            url.as_str(),
            "https://dashboard.example.org/reports/q3.html?draft=1"
        );
    }

    #[test]
    fn test_absolute_form_uris_pass_through() {
        let uri: Uri = "https://fonts.googleapis.com/css2?family=Inter"
            .parse()
            .unwrap();
        let url = absolute_url(&origin(), &uri).unwrap();
        assert_eq!(url.host_str(), Some("fonts.googleapis.com"));
    }

    #[test]
    fn test_sec_fetch_mode_navigate_marks_a_navigation() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        assert_eq!(request_mode(&headers), RequestMode::Navigation);
    }

    #[test]
    fn test_sec_fetch_mode_overrides_the_accept_header() {
        // An explicit subresource mode wins even when the client accepts HTML
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert(
            http::header::ACCEPT,
            HeaderValue::from_static("text/html,*/*"),
        );
        assert_eq!(request_mode(&headers), RequestMode::Subresource);
    }

    #[test]
    fn test_accept_html_falls_back_to_navigation() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        assert_eq!(request_mode(&headers), RequestMode::Navigation);
    }

    #[test]
    fn test_plain_requests_are_subresources() {
        assert_eq!(request_mode(&HeaderMap::new()), RequestMode::Subresource);
    }

    #[test]
    fn test_hop_by_hop_headers_are_not_replayed() {
        let asset = AssetResponse::new(
            200,
            vec![
                ("content-type".to_string(), "text/css".to_string()),
                ("connection".to_string(), "keep-alive".to_string()),
                ("transfer-encoding".to_string(), "chunked".to_string()),
                ("content-length".to_string(), "999".to_string()),
            ],
            Bytes::from_static(b"body { margin: 0 }"),
        );

        let response = to_http_response(asset, Some("store"));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/css"
        );
        assert!(response.headers().get("connection").is_none());
        assert!(response.headers().get("transfer-encoding").is_none());
        assert_eq!(response.headers().get(SOURCE_HEADER).unwrap(), "store");
    }

    #[test]
    fn test_bypassed_responses_carry_no_source_header() {
        let asset = AssetResponse::new(200, vec![], Bytes::from_static(b"ok"));
        let response = to_http_response(asset, None);
        assert!(response.headers().get(SOURCE_HEADER).is_none());
    }

    #[test]
    fn test_unknown_status_codes_become_bad_gateway() {
        let asset = AssetResponse::new(23, vec![], Bytes::new());
        let response = to_http_response(asset, None);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_response_is_json() {
        let response = error_response(StatusCode::BAD_REQUEST, "nope");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
