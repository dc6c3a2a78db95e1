//! Strategy execution
//!
//! One function per resolution strategy. Each takes the active store, the
//! fetcher, and the request, and settles to exactly one response (or one
//! error). Strategies never write anything but 2xx responses to the store,
//! and they treat a broken store read as a plain miss so a damaged store
//! degrades to extra network traffic instead of failed requests.
//!
//! # Design
//!
//! Functions return structured results instead of touching any transport.
//! The caller decides how a `Resolved` becomes bytes on a socket, which is
//! what keeps every strategy testable with scripted stores and fetchers.

use std::sync::Arc;

use url::Url;

use crate::classify::Strategy;
use crate::error::ResolveError;
use crate::fetch::{FetchError, Fetcher};
use crate::manager::offline;
use crate::request::AssetRequest;
use crate::store::{AssetResponse, Store};

// ============================================================================
// Result Types
// ============================================================================

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Replayed from the active store
    Store,
    /// Fresh off the network
    Network,
    /// Synthesized offline page
    Offline,
}

impl ResponseSource {
    /// Source name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ResponseSource::Store => "store",
            ResponseSource::Network => "network",
            ResponseSource::Offline => "offline",
        }
    }
}

/// A settled resolution: one response, its provenance, and the strategy
/// that produced it.
#[derive(Debug)]
pub struct Resolved {
    pub response: AssetResponse,
    pub source: ResponseSource,
    pub strategy: Strategy,
}

// ============================================================================
// Strategies
// ============================================================================

/// Network-first: try the network, fall back to the store.
///
/// Fresh 2xx responses are persisted on the way through. When the network
/// fails, the stored copy answers instead; a navigation with no stored
/// copy gets the offline page, anything else propagates the failure.
pub(crate) async fn network_first(
    store: &Arc<dyn Store>,
    fetcher: &Arc<dyn Fetcher>,
    request: &AssetRequest,
) -> Result<Resolved, ResolveError> {
    match fetcher.fetch(request).await {
        Ok(response) => {
            persist(store.as_ref(), request, &response).await;
            Ok(Resolved {
                response,
                source: ResponseSource::Network,
                strategy: Strategy::NetworkFirst,
            })
        }
        Err(err) => {
            tracing::debug!(url = %request.url, error = %err, "network-first fetch failed, trying store");
            match lookup(store.as_ref(), request).await {
                Some(response) => Ok(Resolved {
                    response,
                    source: ResponseSource::Store,
                    strategy: Strategy::NetworkFirst,
                }),
                None => unreachable_fallback(request, err, Strategy::NetworkFirst),
            }
        }
    }
}

/// Cache-first: serve the stored copy, fetch only on a miss.
///
/// A miss goes to the network and the 2xx result is persisted for next
/// time. Network failure on a miss propagates, except for navigations,
/// which get the offline page.
pub(crate) async fn cache_first(
    store: &Arc<dyn Store>,
    fetcher: &Arc<dyn Fetcher>,
    request: &AssetRequest,
) -> Result<Resolved, ResolveError> {
    if let Some(response) = lookup(store.as_ref(), request).await {
        return Ok(Resolved {
            response,
            source: ResponseSource::Store,
            strategy: Strategy::CacheFirst,
        });
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            persist(store.as_ref(), request, &response).await;
            Ok(Resolved {
                response,
                source: ResponseSource::Network,
                strategy: Strategy::CacheFirst,
            })
        }
        Err(err) => unreachable_fallback(request, err, Strategy::CacheFirst),
    }
}

/// Stale-while-revalidate: answer from the store immediately, refresh in
/// the background.
///
/// The revalidation task is detached and entirely best-effort: it never
/// delays the returned response, and whatever it fetches only lands in the
/// store for the next request. With nothing stored, the caller waits on
/// the network and its failure propagates.
pub(crate) async fn stale_while_revalidate(
    store: &Arc<dyn Store>,
    fetcher: &Arc<dyn Fetcher>,
    request: &AssetRequest,
) -> Result<Resolved, ResolveError> {
    if let Some(response) = lookup(store.as_ref(), request).await {
        spawn_revalidation(Arc::clone(store), Arc::clone(fetcher), request.clone());
        return Ok(Resolved {
            response,
            source: ResponseSource::Store,
            strategy: Strategy::StaleWhileRevalidate,
        });
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            persist(store.as_ref(), request, &response).await;
            Ok(Resolved {
                response,
                source: ResponseSource::Network,
                strategy: Strategy::StaleWhileRevalidate,
            })
        }
        Err(err) => Err(ResolveError::Unreachable {
            url: request.url.to_string(),
            source: err,
        }),
    }
}

/// Default: cache-first with network fallback, persisting same-origin
/// responses only.
///
/// Cross-origin responses pass through untouched so one manager never
/// squats on another origin's assets outside the explicit rule groups.
pub(crate) async fn cache_fallback(
    store: &Arc<dyn Store>,
    fetcher: &Arc<dyn Fetcher>,
    origin: &Url,
    request: &AssetRequest,
) -> Result<Resolved, ResolveError> {
    if let Some(response) = lookup(store.as_ref(), request).await {
        return Ok(Resolved {
            response,
            source: ResponseSource::Store,
            strategy: Strategy::Default,
        });
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            if is_same_origin(&request.url, origin) {
                persist(store.as_ref(), request, &response).await;
            }
            Ok(Resolved {
                response,
                source: ResponseSource::Network,
                strategy: Strategy::Default,
            })
        }
        Err(err) => unreachable_fallback(request, err, Strategy::Default),
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Read the store, folding errors into a miss
async fn lookup(store: &dyn Store, request: &AssetRequest) -> Option<AssetResponse> {
    match store.get(&request.key()).await {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(url = %request.url, error = %err, "store read failed, treating as miss");
            None
        }
    }
}

/// Persist a response when, and only when, it is a 2xx.
/// A failed write is logged and the response is served uncached.
async fn persist(store: &dyn Store, request: &AssetRequest, response: &AssetResponse) {
    if !response.is_success() {
        return;
    }
    if let Err(err) = store.put(request.key(), response.clone()).await {
        tracing::warn!(url = %request.url, error = %err, "store write failed, serving response uncached");
    }
}

/// Final fallback once both network and store have come up empty:
/// navigations get the offline page, everything else propagates.
fn unreachable_fallback(
    request: &AssetRequest,
    err: FetchError,
    strategy: Strategy,
) -> Result<Resolved, ResolveError> {
    if request.is_navigation() {
        Ok(Resolved {
            response: offline::offline_page(),
            source: ResponseSource::Offline,
            strategy,
        })
    } else {
        Err(ResolveError::Unreachable {
            url: request.url.to_string(),
            source: err,
        })
    }
}

fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}

fn spawn_revalidation(store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>, request: AssetRequest) {
    tokio::spawn(async move {
        match fetcher.fetch(&request).await {
            Ok(response) if response.is_success() => {
                match store.put(request.key(), response).await {
                    Ok(()) => {
                        tracing::debug!(url = %request.url, "revalidated stored copy");
                    }
                    Err(err) => {
                        tracing::warn!(url = %request.url, error = %err, "revalidation write failed");
                    }
                }
            }
            Ok(response) => {
                tracing::debug!(
                    url = %request.url,
                    status = response.status,
                    "revalidation answered non-success, keeping stored copy"
                );
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "revalidation fetch failed, keeping stored copy");
            }
        }
    });
}
