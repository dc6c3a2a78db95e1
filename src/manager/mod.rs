//! Cache manager
//!
//! The manager ties everything together: it owns the version tag, the
//! classification rules, the store registry, and the fetcher, and it walks
//! the install / activate lifecycle before answering requests.
//!
//! One instance serves an entire process. Hosts construct it once at
//! startup, drive `install` and `activate`, then call `resolve` for every
//! intercepted request and `handle_message` for every control command.

pub mod messages;
pub mod offline;
pub mod strategies;

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use url::Url;

use crate::classify::{RuleSet, Strategy};
use crate::config::{Config, ConfigError};
use crate::error::{InstallError, ResolveError};
use crate::fetch::Fetcher;
use crate::request::AssetRequest;
use crate::store::{Store, StoreRegistry, StoreStats};

pub use messages::{Command, CommandReply, ControlMessage, LifecycleEvent};
pub use strategies::{Resolved, ResponseSource};

/// Lifecycle states of a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Constructed, precache not attempted (or failed)
    Uninstalled,
    /// Precaching the manifest
    Installing,
    /// Manifest stored, not yet serving as the active version
    Installed,
    /// Serving requests
    Active,
}

impl ManagerState {
    /// State name for logging and reports
    pub fn name(&self) -> &'static str {
        match self {
            ManagerState::Uninstalled => "uninstalled",
            ManagerState::Installing => "installing",
            ManagerState::Installed => "installed",
            ManagerState::Active => "active",
        }
    }
}

impl std::fmt::Display for ManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of `Manager::resolve`
#[derive(Debug)]
pub enum Resolution {
    /// The manager produced a response
    Answered(Resolved),
    /// Out of scope for resolution; the host forwards the request to the
    /// network untouched
    Bypass(AssetRequest),
}

/// The offline cache manager
pub struct Manager {
    version: String,
    origin: Url,
    precache: Vec<String>,
    rules: RuleSet,
    registry: Arc<StoreRegistry>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<ManagerState>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl Manager {
    /// Build a manager from validated configuration.
    /// Fails if the origin does not parse or a rule pattern is invalid.
    pub fn from_config(
        config: &Config,
        registry: Arc<StoreRegistry>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let rules = RuleSet::compile(
            &config.rules.network_first,
            &config.rules.cache_first,
            &config.rules.stale_while_revalidate,
        )?;
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            version: config.version.clone(),
            origin,
            precache: config.precache.clone(),
            rules,
            registry,
            fetcher,
            state: RwLock::new(ManagerState::Uninstalled),
            events,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn state(&self) -> ManagerState {
        *self.state.read()
    }

    /// The versioned name of this manager's store
    pub fn store_name(&self) -> String {
        self.registry.name_for(&self.version)
    }

    /// Subscribe to lifecycle broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Statistics for the active store
    pub async fn store_stats(&self) -> StoreStats {
        match self.current_store().stats().await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(error = %err, "store stats unavailable");
                StoreStats::default()
            }
        }
    }

    fn set_state(&self, next: ManagerState) {
        *self.state.write() = next;
    }

    fn current_store(&self) -> Arc<dyn Store> {
        self.registry.open(&self.store_name())
    }

    /// Precache the manifest into this version's store.
    ///
    /// All-or-nothing: the first entry that cannot be fetched, answers
    /// outside 2xx, or fails to store aborts the run, the partial store is
    /// dropped, and the manager returns to `Uninstalled` so a later retry
    /// starts clean.
    pub async fn install(&self) -> Result<(), InstallError> {
        self.set_state(ManagerState::Installing);
        tracing::info!(
            version = %self.version,
            entries = self.precache.len(),
            store = %self.store_name(),
            "installing precache manifest"
        );

        let store = self.current_store();
        for entry in &self.precache {
            if let Err(err) = self.precache_one(&store, entry).await {
                tracing::error!(version = %self.version, error = %err, "install failed");
                self.registry.delete(&self.store_name());
                self.set_state(ManagerState::Uninstalled);
                return Err(err);
            }
        }

        self.set_state(ManagerState::Installed);
        tracing::info!(version = %self.version, "install complete");
        Ok(())
    }

    /// Become the active version.
    ///
    /// Retires every owned store except the current one, then announces
    /// the version to lifecycle subscribers. Stores outside this manager's
    /// prefix are never touched. Returns the retired store names.
    pub async fn activate(&self) -> Vec<String> {
        let was_active = self.state() == ManagerState::Active;
        let retired = self.registry.purge_except(&self.store_name());
        if !retired.is_empty() {
            tracing::info!(version = %self.version, retired = ?retired, "retired stale stores");
        }

        self.set_state(ManagerState::Active);
        if !was_active {
            let event = LifecycleEvent::Updated {
                version: self.version.clone(),
            };
            let _ = self.events.send(event);
            tracing::info!(version = %self.version, "manager active");
        }
        retired
    }

    /// Resolve one intercepted request to exactly one outcome.
    ///
    /// Non-GET and non-http(s) requests bypass resolution entirely, with
    /// no store reads or writes. Everything else is classified once and
    /// handed to its strategy.
    pub async fn resolve(&self, request: AssetRequest) -> Result<Resolution, ResolveError> {
        if !request.is_interceptable() {
            tracing::debug!(method = %request.method, url = %request.url, "request bypasses resolution");
            return Ok(Resolution::Bypass(request));
        }

        let strategy = self.rules.classify(&request.url);
        tracing::debug!(
            url = %request.url,
            strategy = strategy.name(),
            mode = request.mode.name(),
            "classified request"
        );

        let store = self.current_store();
        let resolved = match strategy {
            Strategy::NetworkFirst => {
                strategies::network_first(&store, &self.fetcher, &request).await?
            }
            Strategy::CacheFirst => {
                strategies::cache_first(&store, &self.fetcher, &request).await?
            }
            Strategy::StaleWhileRevalidate => {
                strategies::stale_while_revalidate(&store, &self.fetcher, &request).await?
            }
            Strategy::Default => {
                strategies::cache_fallback(&store, &self.fetcher, &self.origin, &request).await?
            }
        };

        tracing::debug!(
            url = %request.url,
            source = resolved.source.name(),
            status = resolved.response.status,
            "request resolved"
        );
        Ok(Resolution::Answered(resolved))
    }

    /// Execute one control command and answer it.
    pub async fn handle_message(&self, message: ControlMessage) {
        tracing::debug!(command = message.command.name(), "control command received");
        let command = message.command.clone();
        match command {
            Command::SkipWaiting => {
                self.activate().await;
                message.reply(CommandReply::success(true));
            }
            Command::GetVersion => {
                message.reply(CommandReply::version(self.version.clone()));
            }
            Command::ClearCache => {
                let deleted = self.registry.clear_owned();
                tracing::info!(stores = deleted, "cleared owned stores on request");
                message.reply(CommandReply::success(true));
            }
            Command::CacheUrls { urls } => {
                let all_stored = self.cache_urls(&urls).await;
                message.reply(CommandReply::success(all_stored));
            }
        }
    }

    /// Fetch and store a batch of URLs, best-effort and in parallel.
    /// Successes stay stored even when siblings fail; the return value
    /// reports whether every entry landed.
    async fn cache_urls(&self, urls: &[String]) -> bool {
        let store = self.current_store();
        let attempts = urls.iter().map(|entry| {
            let store = Arc::clone(&store);
            async move {
                match self.precache_one(&store, entry).await {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(entry = %entry, error = %err, "on-demand precache entry failed");
                        false
                    }
                }
            }
        });

        let results = futures::future::join_all(attempts).await;
        let failed = results.iter().filter(|stored| !**stored).count();
        if failed > 0 {
            tracing::warn!(failed, total = urls.len(), "on-demand precache finished with failures");
        }
        failed == 0
    }

    /// Fetch one manifest entry and store it, requiring a 2xx answer
    async fn precache_one(&self, store: &Arc<dyn Store>, entry: &str) -> Result<(), InstallError> {
        let url = self.absolute_url(entry)?;
        let request = AssetRequest::get(url.clone());

        let response =
            self.fetcher
                .fetch(&request)
                .await
                .map_err(|source| InstallError::Fetch {
                    url: url.to_string(),
                    source,
                })?;

        if !response.is_success() {
            return Err(InstallError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        store
            .put(request.key(), response)
            .await
            .map_err(|source| InstallError::Store {
                url: url.to_string(),
                source,
            })?;

        tracing::debug!(url = %url, "precached");
        Ok(())
    }

    /// Resolve a manifest entry against the configured origin.
    /// Absolute entries are taken as-is; everything else joins the origin.
    fn absolute_url(&self, entry: &str) -> Result<Url, InstallError> {
        match Url::parse(entry) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.origin
                    .join(entry)
                    .map_err(|source| InstallError::BadEntry {
                        entry: entry.to_string(),
                        source,
                    })
            }
            Err(source) => Err(InstallError::BadEntry {
                entry: entry.to_string(),
                source,
            }),
        }
    }
}
