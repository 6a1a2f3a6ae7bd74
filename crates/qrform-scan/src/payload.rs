//! The text a QR label carries and how it splits into form values.
//!
//! Labels are written as `Batch: B100, Part: P200, Quantity: 5`. Only the
//! position of a segment matters; its label is never checked, so localized
//! labels parse the same way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::form::FormField;
use crate::{ScanError, ScanResult};

/// Separates the three `label: value` segments.
pub const SEGMENT_SEPARATOR: &str = ", ";

/// Separates a label from its value.
pub const VALUE_SEPARATOR: &str = ": ";

/// Labels used when writing a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLabels {
    pub batch_number: String,
    pub part_number: String,
    pub quantity: String,
}

impl PayloadLabels {
    pub fn english() -> Self {
        Self {
            batch_number: "Batch".to_string(),
            part_number: "Part".to_string(),
            quantity: "Quantity".to_string(),
        }
    }

    pub fn russian() -> Self {
        Self {
            batch_number: "Партия".to_string(),
            part_number: "Деталь".to_string(),
            quantity: "Количество".to_string(),
        }
    }

    fn label(&self, field: FormField) -> &str {
        match field {
            FormField::BatchNumber => &self.batch_number,
            FormField::PartNumber => &self.part_number,
            FormField::Quantity => &self.quantity,
        }
    }
}

impl Default for PayloadLabels {
    fn default() -> Self {
        Self::english()
    }
}

/// Parsed scan payload. Values are kept as text; quantity is not coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPayload {
    pub batch_number: String,
    pub part_number: String,
    pub quantity: String,
}

impl ScanPayload {
    pub fn new(
        batch_number: impl Into<String>,
        part_number: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Self {
        Self {
            batch_number: batch_number.into(),
            part_number: part_number.into(),
            quantity: quantity.into(),
        }
    }

    /// Parse decoded QR text.
    ///
    /// Segments 0, 1 and 2 give batch, part and quantity; anything after the
    /// third segment is ignored. Each value is the token right after the first
    /// `": "`, so `"Part: A: B"` yields `"A"`.
    pub fn parse(text: &str) -> ScanResult<Self> {
        let segments: Vec<&str> = text.split(SEGMENT_SEPARATOR).collect();

        let value_at = |segment: usize| -> ScanResult<String> {
            let raw = segments.get(segment).ok_or_else(|| ScanError::MalformedPayload {
                segment,
                reason: format!("expected 3 segments, found {}", segments.len()),
            })?;

            raw.split(VALUE_SEPARATOR)
                .nth(1)
                .map(str::to_string)
                .ok_or_else(|| ScanError::MalformedPayload {
                    segment,
                    reason: format!("no {VALUE_SEPARATOR:?} separator in {raw:?}"),
                })
        };

        Ok(Self {
            batch_number: value_at(0)?,
            part_number: value_at(1)?,
            quantity: value_at(2)?,
        })
    }

    /// Value for one form field.
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::BatchNumber => &self.batch_number,
            FormField::PartNumber => &self.part_number,
            FormField::Quantity => &self.quantity,
        }
    }

    /// Write the payload with the given labels, ready to be encoded as a QR code.
    ///
    /// Values containing `", "` or `": "` will not parse back to themselves.
    pub fn encode_with_labels(&self, labels: &PayloadLabels) -> String {
        FormField::ALL
            .iter()
            .map(|&field| format!("{}{VALUE_SEPARATOR}{}", labels.label(field), self.value(field)))
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR)
    }
}

impl FromStr for ScanPayload {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScanPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode_with_labels(&PayloadLabels::english()))
    }
}
