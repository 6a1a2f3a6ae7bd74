//! # QR Form Scan
//!
//! Turns decoded QR text into inventory form values.
//!
//! ## Architecture
//!
//! ```text
//! QrScanner (camera loop, decoding)
//!     │  on_result(text, meta)
//!     ▼
//! ScanBridge ── ScanPayload::parse ──▶ FormSink
//!                                      ├── batch_number
//!                                      ├── part_number
//!                                      └── quantity
//! ```
//!
//! A payload is parsed completely before any field is written, so a
//! malformed scan never leaves the form half-filled.

use thiserror::Error;

pub mod bridge;
pub mod form;
pub mod payload;
pub mod scanner;

pub use bridge::{ScanBridge, ScanSession};
pub use form::{FormField, FormFields, FormIds, FormInput, FormSink, InputType};
pub use payload::{PayloadLabels, ScanPayload, SEGMENT_SEPARATOR, VALUE_SEPARATOR};
pub use scanner::{QrScanner, ReplayScanner, ScanResultMeta, ScannerConfig};

/// Errors from parsing scans and filling the form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Decoded text does not have the `Label: value, …` shape.
    #[error("Malformed scan payload at segment {segment}: {reason}")]
    MalformedPayload { segment: usize, reason: String },

    /// The form has no input with this id.
    #[error("Unknown form field: {0}")]
    UnknownField(String),

    /// The scanner could not start or stopped abnormally.
    #[error("Scanner error: {0}")]
    Scanner(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
