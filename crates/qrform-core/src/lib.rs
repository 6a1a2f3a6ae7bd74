//! QR Inventory Core
//!
//! Configuration for the offline worker and the scan bridge, and the runtime
//! that wires them to a cache storage and a fetcher.

pub mod config;
pub mod runtime;

pub use config::AppConfig;
pub use runtime::{load_snapshot, InstallReport, OfflineRuntime};
