//! # Form Inputs
//!
//! The inventory entry form as the bridge sees it: three text inputs
//! addressed by element id.

use serde::{Deserialize, Serialize};

use crate::{ScanError, ScanResult};

/// The fields a scan fills, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    BatchNumber,
    PartNumber,
    Quantity,
}

impl FormField {
    /// Write order.
    pub const ALL: [FormField; 3] = [
        FormField::BatchNumber,
        FormField::PartNumber,
        FormField::Quantity,
    ];

    /// Element id used by the stock form.
    pub fn default_id(self) -> &'static str {
        match self {
            FormField::BatchNumber => "batch_number",
            FormField::PartNumber => "part_number",
            FormField::Quantity => "quantity",
        }
    }
}

/// Element ids of the three inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormIds {
    pub batch_number: String,
    pub part_number: String,
    pub quantity: String,
}

impl FormIds {
    pub fn id(&self, field: FormField) -> &str {
        match field {
            FormField::BatchNumber => &self.batch_number,
            FormField::PartNumber => &self.part_number,
            FormField::Quantity => &self.quantity,
        }
    }
}

impl Default for FormIds {
    fn default() -> Self {
        Self {
            batch_number: FormField::BatchNumber.default_id().to_string(),
            part_number: FormField::PartNumber.default_id().to_string(),
            quantity: FormField::Quantity.default_id().to_string(),
        }
    }
}

/// Input type for HTML input elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    Text,
    Number,
    Hidden,
}

/// One form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInput {
    id: String,
    input_type: InputType,
    value: String,
}

impl FormInput {
    pub fn new(id: impl Into<String>, input_type: InputType) -> Self {
        Self {
            id: id.into(),
            input_type,
            value: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    /// Get the current value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Set the value. The input type never filters or coerces it.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

/// Where scanned values are written.
pub trait FormSink {
    /// Whether an input with this id exists.
    fn has_field(&self, id: &str) -> bool;

    /// Set the value of the input with this id.
    fn set_value(&mut self, id: &str, value: &str) -> ScanResult<()>;

    /// Current value of the input with this id.
    fn value(&self, id: &str) -> Option<String>;
}

/// In-memory form.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    inputs: Vec<FormInput>,
}

impl FormFields {
    /// Empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// The inventory form with its three inputs.
    pub fn inventory(ids: &FormIds) -> Self {
        Self::new()
            .with_input(FormInput::new(ids.id(FormField::BatchNumber), InputType::Text))
            .with_input(FormInput::new(ids.id(FormField::PartNumber), InputType::Text))
            .with_input(FormInput::new(ids.id(FormField::Quantity), InputType::Number))
    }

    pub fn with_input(mut self, input: FormInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn input(&self, id: &str) -> Option<&FormInput> {
        self.inputs.iter().find(|i| i.id == id)
    }

    pub fn inputs(&self) -> &[FormInput] {
        &self.inputs
    }

    /// Reset every input to empty.
    pub fn reset(&mut self) {
        for input in &mut self.inputs {
            input.value.clear();
        }
    }
}

impl FormSink for FormFields {
    fn has_field(&self, id: &str) -> bool {
        self.input(id).is_some()
    }

    fn set_value(&mut self, id: &str, value: &str) -> ScanResult<()> {
        let input = self
            .inputs
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ScanError::UnknownField(id.to_string()))?;
        input.set_value(value);
        Ok(())
    }

    fn value(&self, id: &str) -> Option<String> {
        self.input(id).map(|i| i.value.clone())
    }
}
