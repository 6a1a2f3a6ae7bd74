//! # QR Form Service Worker
//!
//! Cache-first offline worker for the inventory entry form.
//!
//! ## Features
//!
//! - **Lifecycle**: install (pre-populate) then activate
//! - **Cache API**: named caches in an injected [`CacheStorage`]
//! - **Fetch Interception**: cache first, network on a miss, no write-back
//!
//! ## Architecture
//!
//! ```text
//! OfflineCacheWorker (WorkerConfig: cache name + asset list)
//!     │
//!     ├── Arc<RwLock<CacheStorage>>   shared with other workers
//!     │       └── Cache (by name)
//!     │               └── URL → CacheEntry
//!     │
//!     └── Arc<dyn Fetcher>            network on install and on a miss
//! ```

use qrform_net::NetError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub mod cache;
pub mod worker;

pub use cache::{Cache, CacheEntry, CacheStorage, SharedCacheStorage};
pub use worker::{FetchResponse, OfflineCacheWorker, WorkerConfig, WorkerEvent};

// ==================== Errors ====================

/// Errors that can occur in service worker operations.
#[derive(Error, Debug)]
pub enum ServiceWorkerError {
    /// Pre-populating the cache failed; nothing from this install was stored.
    #[error("Install failed on {url}: {reason}")]
    InstallFailure { url: String, reason: String },

    /// A cache miss went to the network and the network failed.
    #[error("Network fetch for {url} failed: {source}")]
    FetchPassthroughFailure {
        url: String,
        #[source]
        source: NetError,
    },

    #[error("State error: {0}")]
    StateError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

// ==================== Types ====================

/// Unique identifier for a service worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceWorkerId(u64);

impl ServiceWorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Service worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceWorkerState {
    /// Created, install not started.
    #[default]
    Parsed,
    /// Installing (pre-populating the cache).
    Installing,
    /// Installed, about to activate.
    Installed,
    /// Activating.
    Activating,
    /// Active and answering fetches.
    Activated,
    /// Install failed; never activated.
    Redundant,
}

impl ServiceWorkerState {
    /// Whether a worker may move from `self` to `next`.
    pub fn can_transition_to(self, next: ServiceWorkerState) -> bool {
        use ServiceWorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installing, Redundant)
                | (Installed, Activating)
                | (Activating, Activated)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        assert_eq!(ServiceWorkerState::default(), ServiceWorkerState::Parsed);
    }

    #[test]
    fn test_state_transitions() {
        use ServiceWorkerState::*;
        assert!(Parsed.can_transition_to(Installing));
        assert!(Installing.can_transition_to(Redundant));
        assert!(Activating.can_transition_to(Activated));

        assert!(!Parsed.can_transition_to(Activated));
        assert!(!Redundant.can_transition_to(Installing));
        assert!(!Activated.can_transition_to(Installing));
    }

    #[test]
    fn test_worker_ids_unique() {
        assert_ne!(ServiceWorkerId::new(), ServiceWorkerId::new());
    }

    #[test]
    fn test_install_failure_message() {
        let err = ServiceWorkerError::InstallFailure {
            url: "http://localhost:8000/manifest.json".into(),
            reason: "status 404".into(),
        };
        assert_eq!(
            err.to_string(),
            "Install failed on http://localhost:8000/manifest.json: status 404"
        );
    }
}
