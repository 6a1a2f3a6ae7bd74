//! Front-end configuration

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use qrform_common::{QrFormError, Result};
use qrform_net::FetcherConfig;
use qrform_scan::{FormIds, ScannerConfig};
use qrform_sw::WorkerConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Front-end configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Origin the workers are registered for; relative assets resolve against it
    pub scope: String,

    /// One entry per offline worker
    pub workers: Vec<WorkerConfig>,

    /// Scanner settings
    pub scanner: ScannerConfig,

    /// Element ids of the form inputs
    pub form: FormIds,

    /// HTTP client settings
    pub fetcher: FetcherConfig,

    /// Where the cache storage snapshot is written, if anywhere
    pub snapshot_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scope: "http://localhost:8000/".to_string(),
            workers: vec![WorkerConfig::inventory_shell(), WorkerConfig::scanner_app()],
            scanner: ScannerConfig::default(),
            form: FormIds::default(),
            fetcher: FetcherConfig::default(),
            snapshot_path: Self::default_snapshot_path(),
        }
    }
}

impl AppConfig {
    /// Platform cache directory, e.g. `~/.cache/qrform/caches.json`
    pub fn default_snapshot_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("qrform").join("caches.json"))
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| QrFormError::config_with_source("invalid config JSON", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parsed scope URL
    pub fn scope_url(&self) -> Result<Url> {
        let scope = Url::parse(&self.scope)
            .map_err(|e| QrFormError::config_with_source(format!("invalid scope {}", self.scope), e))?;
        if scope.cannot_be_a_base() {
            return Err(QrFormError::config(format!(
                "scope {} cannot resolve relative assets",
                self.scope
            )));
        }
        Ok(scope)
    }

    /// Reject configs the workers cannot run with.
    pub fn validate(&self) -> Result<()> {
        let scope = self.scope_url()?;

        let mut names = HashSet::new();
        for worker in &self.workers {
            if worker.cache_name.trim().is_empty() {
                return Err(QrFormError::config("worker cache name is empty"));
            }
            // Two workers on one cache name would overwrite each other.
            if !names.insert(worker.cache_name.as_str()) {
                return Err(QrFormError::config(format!(
                    "cache name {} is used by more than one worker",
                    worker.cache_name
                )));
            }
            worker
                .resolve_assets(&scope)
                .map_err(|e| QrFormError::config_with_source("unresolvable asset", e))?;
        }

        self.scanner
            .validate()
            .map_err(|e| QrFormError::config_with_source("invalid scanner settings", e))?;

        Ok(())
    }
}
