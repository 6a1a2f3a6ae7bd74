//! The boundary to the QR scanning component.
//!
//! The scanner owns the capture loop and decoding; callers only hand it a
//! callback that runs once per successful decode.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ScanError, ScanResult};

/// Scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Element the scanner renders its viewfinder into.
    pub container_id: String,
    /// Frames decoded per second.
    pub fps: u32,
    /// Side of the square scan box, in pixels.
    pub qrbox: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            container_id: "reader".to_string(),
            fps: 10,
            qrbox: 250,
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> ScanResult<()> {
        if self.container_id.is_empty() {
            return Err(ScanError::Scanner("container id is empty".to_string()));
        }
        if self.fps == 0 {
            return Err(ScanError::Scanner("fps must be positive".to_string()));
        }
        if self.qrbox == 0 {
            return Err(ScanError::Scanner("qrbox must be positive".to_string()));
        }
        Ok(())
    }
}

/// Metadata the scanner attaches to a decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResultMeta {
    /// Symbology, e.g. `QR_CODE`.
    pub format: String,
    /// Index of the frame the code was decoded from.
    pub frame: u64,
}

impl Default for ScanResultMeta {
    fn default() -> Self {
        Self {
            format: "QR_CODE".to_string(),
            frame: 0,
        }
    }
}

/// A QR scanning component.
pub trait QrScanner {
    /// Run the capture loop, calling `on_result` once per decoded code.
    ///
    /// Returns when the scanner stops.
    fn start(
        &mut self,
        config: &ScannerConfig,
        on_result: &mut dyn FnMut(&str, &ScanResultMeta),
    ) -> ScanResult<()>;
}

/// Scanner that replays already-decoded texts, one per frame.
#[derive(Debug, Clone, Default)]
pub struct ReplayScanner {
    decoded: VecDeque<String>,
}

impl ReplayScanner {
    pub fn new<I, S>(decoded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            decoded: decoded.into_iter().map(Into::into).collect(),
        }
    }

    /// Texts not yet replayed.
    pub fn remaining(&self) -> usize {
        self.decoded.len()
    }
}

impl QrScanner for ReplayScanner {
    fn start(
        &mut self,
        config: &ScannerConfig,
        on_result: &mut dyn FnMut(&str, &ScanResultMeta),
    ) -> ScanResult<()> {
        config.validate()?;
        debug!(container = %config.container_id, fps = config.fps, qrbox = config.qrbox, "Replay scanner started");

        let mut frame = 0;
        while let Some(text) = self.decoded.pop_front() {
            let meta = ScanResultMeta {
                frame,
                ..Default::default()
            };
            on_result(&text, &meta);
            frame += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.container_id, "reader");
        assert_eq!(config.fps, 10);
        assert_eq!(config.qrbox, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ScannerConfig = serde_json::from_str(r#"{"fps": 5}"#).unwrap();
        assert_eq!(config.fps, 5);
        assert_eq!(config.qrbox, 250);
    }

    #[test]
    fn test_invalid_config() {
        let config = ScannerConfig {
            fps: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ScanError::Scanner(_))));
    }

    #[test]
    fn test_replay_calls_back_once_per_text() {
        let mut scanner = ReplayScanner::new(["a", "b"]);
        let mut seen = Vec::new();

        scanner
            .start(&ScannerConfig::default(), &mut |text, meta| {
                seen.push((text.to_string(), meta.frame));
            })
            .unwrap();

        assert_eq!(seen, vec![("a".to_string(), 0), ("b".to_string(), 1)]);
        assert_eq!(scanner.remaining(), 0);
    }

    #[test]
    fn test_replay_refuses_bad_config() {
        let mut scanner = ReplayScanner::new(["a"]);
        let config = ScannerConfig {
            qrbox: 0,
            ..Default::default()
        };

        assert!(scanner.start(&config, &mut |_, _| {}).is_err());
        assert_eq!(scanner.remaining(), 1);
    }
}
