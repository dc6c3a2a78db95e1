//! Offline fallback page
//!
//! When a page navigation can be satisfied neither from the network nor
//! from the store, the manager answers with this synthesized page instead
//! of letting the browser show its own error. The markup is fully
//! self-contained: styles and script are inline and nothing references
//! another URL, so the page renders with zero connectivity.
//!
//! The page retries on its own when the browser fires the `online` event
//! and offers a manual retry button for flaky links that never go fully
//! offline.

use bytes::Bytes;

use crate::store::AssetResponse;

/// Marker header set on every synthesized offline response
pub const FALLBACK_HEADER: &str = "x-cachette-fallback";

const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Offline</title>
<style>
  * { box-sizing: border-box; }
  body {
    margin: 0;
    font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
    background: #f4f5f7;
    color: #1f2430;
  }
  main {
    max-width: 26rem;
    margin: 18vh auto 0;
    padding: 2rem 1.5rem;
    text-align: center;
  }
  .glyph {
    font-size: 3rem;
    line-height: 1;
    margin: 0 0 1rem;
  }
  h1 {
    font-size: 1.4rem;
    margin: 0 0 0.5rem;
  }
  p {
    margin: 0 0 1.5rem;
    color: #5b6270;
  }
  button {
    font: inherit;
    padding: 0.6rem 1.6rem;
    border: 0;
    border-radius: 0.4rem;
    background: #2456d6;
    color: #fff;
    cursor: pointer;
  }
  button:hover { background: #1c45ab; }
</style>
</head>
<body>
<main>
  <p class="glyph" aria-hidden="true">&#9729;</p>
  <h1>You are offline</h1>
  <p>This page is not stored for offline use. It will reload by itself as soon as the connection comes back.</p>
  <button onclick="location.reload()">Try again</button>
</main>
<script>
  window.addEventListener('online', function () { location.reload(); });
</script>
</body>
</html>
"#;

/// Build the offline response.
///
/// 503 tells the requester this is a substitute, not the asset it asked
/// for; no-store keeps intermediaries from replaying it once connectivity
/// is back.
pub fn offline_page() -> AssetResponse {
    AssetResponse::new(
        503,
        vec![
            (
                "content-type".to_string(),
                "text/html; charset=utf-8".to_string(),
            ),
            ("cache-control".to_string(), "no-store".to_string()),
            (FALLBACK_HEADER.to_string(), "offline".to_string()),
        ],
        Bytes::from_static(OFFLINE_HTML.as_bytes()),
    )
}
