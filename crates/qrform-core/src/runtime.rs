//! Wires configured workers to one cache storage and one fetcher.

use std::path::Path;
use std::sync::Arc;

use qrform_common::{OptionExt, QrFormError, Result};
use qrform_net::{Fetcher, HttpFetcher, Request};
use qrform_scan::{FormFields, QrScanner, ScanBridge, ScanSession};
use qrform_sw::{
    CacheStorage, FetchResponse, OfflineCacheWorker, ServiceWorkerError, SharedCacheStorage,
};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Which workers came up after [`OfflineRuntime::install_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Cache names of activated workers.
    pub activated: Vec<String>,
    /// Cache name and reason for each worker that failed to install.
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    pub fn all_activated(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Every configured worker sharing one storage.
pub struct OfflineRuntime {
    config: AppConfig,
    caches: SharedCacheStorage,
    workers: Vec<OfflineCacheWorker>,
}

impl OfflineRuntime {
    /// Build the workers. Nothing is fetched until [`install_all`](Self::install_all).
    pub fn new(config: AppConfig, caches: SharedCacheStorage, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let scope = config.scope_url()?;

        // Workers log their own state changes; the event receivers are dropped.
        let workers = config
            .workers
            .iter()
            .map(|worker| {
                let (worker, _events) = OfflineCacheWorker::new(
                    scope.clone(),
                    worker.clone(),
                    Arc::clone(&caches),
                    Arc::clone(&fetcher),
                );
                worker
            })
            .collect();

        Ok(Self {
            config,
            caches,
            workers,
        })
    }

    /// Fresh storage and a reqwest fetcher built from the config.
    pub fn with_http(config: AppConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetcher)
            .map_err(|e| QrFormError::network_with_source("could not build HTTP client", e))?;
        Self::new(config, CacheStorage::new().shared(), Arc::new(fetcher))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn caches(&self) -> SharedCacheStorage {
        Arc::clone(&self.caches)
    }

    pub fn workers(&self) -> &[OfflineCacheWorker] {
        &self.workers
    }

    /// Worker owning `cache_name`.
    pub fn worker(&self, cache_name: &str) -> Option<&OfflineCacheWorker> {
        self.workers.iter().find(|w| w.cache_name() == cache_name)
    }

    /// Install every worker. One worker failing does not stop the others.
    pub async fn install_all(&mut self) -> InstallReport {
        let mut report = InstallReport::default();

        for worker in &mut self.workers {
            let name = worker.cache_name().to_string();
            match worker.on_install().await {
                Ok(()) => report.activated.push(name),
                Err(err) => {
                    warn!(cache = %name, error = %err, "Worker not activated");
                    report.failed.push((name, err.to_string()));
                }
            }
        }

        info!(
            activated = report.activated.len(),
            failed = report.failed.len(),
            "Offline workers installed"
        );

        report
    }

    /// Serve `request` through the worker owning `cache_name`.
    pub async fn fetch(&self, cache_name: &str, request: &Request) -> Result<FetchResponse> {
        let worker = self
            .worker(cache_name)
            .ok_or_not_found(format!("worker for cache {cache_name}"))?;

        worker.on_fetch(request).await.map_err(|err| {
            let is_network = matches!(err, ServiceWorkerError::FetchPassthroughFailure { .. });
            let message = format!("{cache_name} could not serve {}", request.url);
            let err = if is_network {
                QrFormError::network_with_source(message, err)
            } else {
                QrFormError::storage_with_source(message, err)
            };
            warn!(category = err.category(), error = %err, "Fetch failed");
            err
        })
    }

    /// Bridge filling a fresh inventory form with the configured ids.
    pub fn scan_bridge(&self) -> ScanBridge<FormFields> {
        let ids = self.config.form.clone();
        ScanBridge::with_ids(FormFields::inventory(&ids), ids)
    }

    /// Run `scanner` with the configured settings against a fresh inventory form.
    ///
    /// Rejected scans are counted in the session. Only a scanner that fails
    /// to run is an error.
    pub fn scan<Q: QrScanner + ?Sized>(&self, scanner: &mut Q) -> Result<(ScanSession, FormFields)> {
        let mut bridge = self.scan_bridge();
        let session = bridge
            .run(scanner, &self.config.scanner)
            .map_err(|e| QrFormError::scan_with_source("scanner did not run", e))?;
        Ok((session, bridge.into_form()))
    }

    /// Write the storage to the configured snapshot path.
    ///
    /// Returns `false` when no snapshot path is configured.
    pub async fn save_snapshot(&self) -> Result<bool> {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return Ok(false);
        };

        let json = self
            .caches
            .read()
            .await
            .to_json()
            .map_err(|e| QrFormError::storage_with_source("could not serialize caches", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;

        info!(path = %path.display(), "Cache snapshot written");
        Ok(true)
    }
}

/// Read a snapshot written by [`OfflineRuntime::save_snapshot`].
pub async fn load_snapshot(path: &Path) -> Result<CacheStorage> {
    let json = tokio::fs::read_to_string(path).await?;
    CacheStorage::from_json(&json)
        .map_err(|e| QrFormError::storage_with_source(format!("bad snapshot {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrform_net::StaticFetcher;
    use qrform_scan::{FormSink, ReplayScanner, ScanError, ScanResult, ScanResultMeta, ScannerConfig};
    use qrform_sw::WorkerConfig;

    struct CameraBusy;

    impl QrScanner for CameraBusy {
        fn start(
            &mut self,
            _config: &ScannerConfig,
            _on_result: &mut dyn FnMut(&str, &ScanResultMeta),
        ) -> ScanResult<()> {
            Err(ScanError::Scanner("camera busy".to_string()))
        }
    }

    fn shell_fetcher() -> Arc<StaticFetcher> {
        Arc::new(
            StaticFetcher::new()
                .route("http://localhost:8000/", "<html></html>")
                .route("http://localhost:8000/static/icons/icon-192x192.png", "png")
                .route("http://localhost:8000/static/icons/icon-512x512.png", "png")
                .route("http://localhost:8000/manifest.json", "{}"),
        )
    }

    fn config() -> AppConfig {
        AppConfig {
            snapshot_path: None,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_one_failing_worker_does_not_block_others() {
        // Only the shell's assets are routed; the scanner app cannot install.
        let mut runtime =
            OfflineRuntime::new(config(), CacheStorage::new().shared(), shell_fetcher()).unwrap();

        let report = runtime.install_all().await;

        assert_eq!(report.activated, vec!["qr-inventory-cache".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "qr-inventory-v1");
        assert!(!report.all_activated());

        assert!(runtime.worker("qr-inventory-cache").unwrap().is_active());
        assert!(!runtime.worker("qr-inventory-v1").unwrap().is_active());
    }

    #[tokio::test]
    async fn test_active_worker_serves_from_shared_storage() {
        let mut config = config();
        config.workers = vec![WorkerConfig::inventory_shell()];
        let fetcher = shell_fetcher();
        let mut runtime =
            OfflineRuntime::new(config, CacheStorage::new().shared(), fetcher.clone()).unwrap();
        assert!(runtime.install_all().await.all_activated());

        let worker = runtime.worker("qr-inventory-cache").unwrap();
        let request = Request::parse_get("http://localhost:8000/manifest.json").unwrap();
        assert!(worker.on_fetch(&request).await.unwrap().is_from_cache());
        assert_eq!(fetcher.calls("http://localhost:8000/manifest.json"), 1);

        assert_eq!(runtime.caches().read().await.keys(), vec!["qr-inventory-cache"]);
    }

    #[tokio::test]
    async fn test_fetch_routes_by_cache_name() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .route("http://localhost:8000/", "<html></html>")
                .route("http://localhost:8000/static/icons/icon-192x192.png", "png")
                .route("http://localhost:8000/static/icons/icon-512x512.png", "png")
                .route("http://localhost:8000/manifest.json", "{}")
                .fail("http://localhost:8000/api/items", "offline"),
        );
        let mut runtime =
            OfflineRuntime::new(config(), CacheStorage::new().shared(), fetcher).unwrap();
        runtime.install_all().await;

        let manifest = Request::parse_get("http://localhost:8000/manifest.json").unwrap();
        assert!(runtime
            .fetch("qr-inventory-cache", &manifest)
            .await
            .unwrap()
            .is_from_cache());

        let err = runtime.fetch("qr-inventory-v2", &manifest).await.unwrap_err();
        assert_eq!(err.category(), "not_found");

        // The scanner app never activated.
        let err = runtime.fetch("qr-inventory-v1", &manifest).await.unwrap_err();
        assert_eq!(err.category(), "storage");

        let offline = Request::parse_get("http://localhost:8000/api/items").unwrap();
        let err = runtime.fetch("qr-inventory-cache", &offline).await.unwrap_err();
        assert_eq!(err.category(), "network");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_scan_fills_form_with_configured_settings() {
        let runtime =
            OfflineRuntime::new(config(), CacheStorage::new().shared(), shell_fetcher()).unwrap();
        let mut scanner = ReplayScanner::new([
            "Batch: B100, Part: P200",
            "Batch: B7, Part: P8, Quantity: 9",
        ]);

        let (session, form) = runtime.scan(&mut scanner).unwrap();

        assert_eq!(session.accepted, 1);
        assert_eq!(session.rejected, 1);
        assert_eq!(form.value("batch_number").as_deref(), Some("B7"));
        assert_eq!(form.value("quantity").as_deref(), Some("9"));
    }

    #[test]
    fn test_scanner_failure_is_a_scan_error() {
        let runtime =
            OfflineRuntime::new(config(), CacheStorage::new().shared(), shell_fetcher()).unwrap();

        let err = runtime.scan(&mut CameraBusy).unwrap_err();
        assert_eq!(err.category(), "scan");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.workers.push(WorkerConfig::inventory_shell());

        assert!(OfflineRuntime::new(config, CacheStorage::new().shared(), shell_fetcher()).is_err());
    }

    #[test]
    fn test_scan_bridge_uses_configured_ids() {
        let mut config = config();
        config.form.part_number = "part".to_string();
        let runtime =
            OfflineRuntime::new(config, CacheStorage::new().shared(), shell_fetcher()).unwrap();

        let mut bridge = runtime.scan_bridge();
        bridge
            .on_scan_success("Batch: B100, Part: P200, Quantity: 5", &ScanResultMeta::default())
            .unwrap();

        assert_eq!(bridge.form().value("part").as_deref(), Some("P200"));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("caches.json");

        let mut config = config();
        config.workers = vec![WorkerConfig::inventory_shell()];
        config.snapshot_path = Some(path.clone());

        let mut runtime =
            OfflineRuntime::new(config, CacheStorage::new().shared(), shell_fetcher()).unwrap();
        runtime.install_all().await;

        assert!(runtime.save_snapshot().await.unwrap());

        let restored = load_snapshot(&path).await.unwrap();
        let cache = restored.get("qr-inventory-cache").unwrap();
        assert_eq!(cache.len(), 4);
        assert_eq!(
            cache.match_request("http://localhost:8000/manifest.json").unwrap().body,
            b"{}"
        );
    }

    #[tokio::test]
    async fn test_no_snapshot_path() {
        let runtime =
            OfflineRuntime::new(config(), CacheStorage::new().shared(), shell_fetcher()).unwrap();
        assert!(!runtime.save_snapshot().await.unwrap());
    }

    #[tokio::test]
    async fn test_load_snapshot_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caches.json");
        tokio::fs::write(&path, "nope").await.unwrap();

        let err = load_snapshot(&path).await.unwrap_err();
        assert_eq!(err.category(), "storage");
    }
}
