//! The offline worker: install pre-populates a named cache, fetch reads
//! through it to the network.

use std::sync::Arc;

use futures::future::try_join_all;
use http::Method;
use qrform_net::{Fetcher, Request, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheEntry, SharedCacheStorage};
use crate::{ServiceWorkerError, ServiceWorkerId, ServiceWorkerState};

// ==================== Worker Config ====================

/// Cache name and the assets pre-populated into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Name of the cache this worker owns. Change it to invalidate.
    pub cache_name: String,

    /// Asset URLs, absolute or relative to the worker scope.
    pub assets: Vec<String>,
}

impl WorkerConfig {
    /// Create a config.
    pub fn new<I, S>(cache_name: impl Into<String>, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cache_name: cache_name.into(),
            assets: assets.into_iter().map(Into::into).collect(),
        }
    }

    /// App shell: the page, its icons and the web manifest.
    pub fn inventory_shell() -> Self {
        Self::new(
            "qr-inventory-cache",
            [
                "/",
                "/static/icons/icon-192x192.png",
                "/static/icons/icon-512x512.png",
                "/manifest.json",
            ],
        )
    }

    /// Scanner page: the page, its stylesheet and script, and the scanning library.
    pub fn scanner_app() -> Self {
        Self::new(
            "qr-inventory-v1",
            [
                "/",
                "/static/styles.css",
                "/static/app.js",
                "https://unpkg.com/html5-qrcode",
            ],
        )
    }

    /// Resolve every asset against `scope`. Absolute assets are kept as-is.
    pub fn resolve_assets(&self, scope: &Url) -> Result<Vec<Url>, ServiceWorkerError> {
        self.assets
            .iter()
            .map(|asset| {
                scope
                    .join(asset)
                    .map_err(|e| ServiceWorkerError::InvalidUrl(format!("{asset}: {e}")))
            })
            .collect()
    }
}

// ==================== Fetch Response ====================

/// What `on_fetch` answers with.
#[derive(Debug, Clone)]
pub enum FetchResponse {
    /// Served from the worker's cache.
    Cached(CacheEntry),
    /// Passed through from the network, untouched.
    Network(Response),
}

impl FetchResponse {
    pub fn is_from_cache(&self) -> bool {
        matches!(self, FetchResponse::Cached(_))
    }

    pub fn status(&self) -> u16 {
        match self {
            FetchResponse::Cached(entry) => entry.status,
            FetchResponse::Network(response) => response.status.as_u16(),
        }
    }

    pub fn body(&self) -> &[u8] {
        match self {
            FetchResponse::Cached(entry) => &entry.body,
            FetchResponse::Network(response) => response.body().as_ref(),
        }
    }

    /// First value of a response header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).into_iter().next()
    }

    /// Every value of a response header (case-insensitive), in wire order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        match self {
            FetchResponse::Cached(entry) => entry.header_values(name),
            FetchResponse::Network(response) => response
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect(),
        }
    }
}

// ==================== Events ====================

/// Worker events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// State changed.
    StateChange {
        cache_name: String,
        worker_id: ServiceWorkerId,
        new_state: ServiceWorkerState,
    },
}

// ==================== Worker ====================

/// Cache-first offline worker.
///
/// The storage and fetcher are injected; several workers may share one
/// storage as long as their cache names differ.
pub struct OfflineCacheWorker {
    id: ServiceWorkerId,
    scope: Url,
    config: WorkerConfig,
    state: ServiceWorkerState,
    caches: SharedCacheStorage,
    fetcher: Arc<dyn Fetcher>,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl OfflineCacheWorker {
    /// Create a worker in the `Parsed` state.
    pub fn new(
        scope: Url,
        config: WorkerConfig,
        caches: SharedCacheStorage,
        fetcher: Arc<dyn Fetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self {
                id: ServiceWorkerId::new(),
                scope,
                config,
                state: ServiceWorkerState::Parsed,
                caches,
                fetcher,
                event_tx,
            },
            event_rx,
        )
    }

    pub fn id(&self) -> ServiceWorkerId {
        self.id
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn state(&self) -> ServiceWorkerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ServiceWorkerState::Activated
    }

    fn set_state(&mut self, next: ServiceWorkerState) -> Result<(), ServiceWorkerError> {
        if !self.state.can_transition_to(next) {
            return Err(ServiceWorkerError::StateError(format!(
                "cannot move worker from {:?} to {:?}",
                self.state, next
            )));
        }

        debug!(cache = %self.config.cache_name, from = ?self.state, to = ?next, "Worker state change");
        self.state = next;

        // Nobody listening is fine.
        let _ = self.event_tx.send(WorkerEvent::StateChange {
            cache_name: self.config.cache_name.clone(),
            worker_id: self.id,
            new_state: next,
        });

        Ok(())
    }

    /// Pre-populate the cache, then activate.
    ///
    /// All-or-nothing: if any asset fails to fetch or answers with a non-2xx
    /// status, nothing from this install is stored and the worker becomes
    /// redundant.
    pub async fn on_install(&mut self) -> Result<(), ServiceWorkerError> {
        self.set_state(ServiceWorkerState::Installing)?;

        info!(
            cache = %self.config.cache_name,
            assets = self.config.assets.len(),
            "Installing offline cache"
        );

        self.caches.write().await.open(&self.config.cache_name);

        match self.populate().await {
            Ok(entries) => {
                let count = entries.len();
                self.caches
                    .write()
                    .await
                    .open(&self.config.cache_name)
                    .put_all(entries);

                self.set_state(ServiceWorkerState::Installed)?;
                self.set_state(ServiceWorkerState::Activating)?;
                self.set_state(ServiceWorkerState::Activated)?;

                info!(cache = %self.config.cache_name, entries = count, "Offline cache installed");
                Ok(())
            }
            Err(err) => {
                warn!(cache = %self.config.cache_name, error = %err, "Install failed, worker is redundant");
                self.set_state(ServiceWorkerState::Redundant)?;
                Err(err)
            }
        }
    }

    async fn populate(&self) -> Result<Vec<CacheEntry>, ServiceWorkerError> {
        let urls = self.config.resolve_assets(&self.scope).map_err(|e| {
            ServiceWorkerError::InstallFailure {
                url: self.scope.to_string(),
                reason: e.to_string(),
            }
        })?;

        let fetcher = self.fetcher.as_ref();
        let fetches = urls.into_iter().map(move |url| async move {
            let request = Request::get(url);
            let key = request.url.to_string();

            let response = fetcher.fetch(&request).await.map_err(|e| {
                ServiceWorkerError::InstallFailure {
                    url: key.clone(),
                    reason: e.to_string(),
                }
            })?;

            if !response.ok() {
                return Err(ServiceWorkerError::InstallFailure {
                    url: key,
                    reason: format!("status {}", response.status.as_u16()),
                });
            }

            debug!(url = %key, bytes = response.body().len(), "Asset fetched");
            Ok(CacheEntry::from_response(&key, request.method.as_str(), &response))
        });

        try_join_all(fetches).await
    }

    /// Answer a request from the cache, or from the network on a miss.
    ///
    /// Only GET requests are looked up. Misses are never written back.
    pub async fn on_fetch(&self, request: &Request) -> Result<FetchResponse, ServiceWorkerError> {
        if !self.is_active() {
            return Err(ServiceWorkerError::StateError(format!(
                "worker for {} is {:?}, not active",
                self.config.cache_name, self.state
            )));
        }

        let url = request.url.as_str();

        if request.method == Method::GET {
            let caches = self.caches.read().await;
            let hit = caches
                .get(&self.config.cache_name)
                .and_then(|cache| cache.match_request(url));

            if let Some(entry) = hit {
                debug!(url, cache = %self.config.cache_name, "Cache hit");
                return Ok(FetchResponse::Cached(entry.clone()));
            }
        }

        debug!(url, method = %request.method, "Cache miss, fetching from network");

        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(FetchResponse::Network(response)),
            Err(source) => {
                warn!(url, error = %source, "Network fetch failed");
                Err(ServiceWorkerError::FetchPassthroughFailure {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }
}
