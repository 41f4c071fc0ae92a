//! Prompt input values and their text rendering

use crate::types::ThreadMessage;
use std::collections::BTreeMap;

/// One named value substituted into a prompt template
#[derive(Clone, Debug, PartialEq)]
pub enum InputValue {
    /// Passed through unchanged
    Scalar(String),
    /// Record-like sequence, rendered one numbered line per item
    Records(Vec<ThreadMessage>),
    /// Any other structured value, rendered as indented JSON
    Structured(serde_json::Value),
}

impl InputValue {
    /// Text substituted for this value's placeholder
    pub fn render(&self) -> String {
        match self {
            InputValue::Scalar(text) => text.clone(),
            InputValue::Records(records) => records
                .iter()
                .enumerate()
                .map(|(i, record)| {
                    let author = record.author.as_deref().unwrap_or("User");
                    let text = match &record.text {
                        Some(text) => text.clone(),
                        None => serde_json::to_string(record).unwrap_or_default(),
                    };
                    format!("{}. {}: {}", i + 1, author, text)
                })
                .collect::<Vec<_>>()
                .join("\n"),
            InputValue::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Scalar(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::Scalar(value)
    }
}

impl From<Vec<ThreadMessage>> for InputValue {
    fn from(value: Vec<ThreadMessage>) -> Self {
        InputValue::Records(value)
    }
}

impl From<serde_json::Value> for InputValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => InputValue::Scalar(text),
            other => InputValue::Structured(other),
        }
    }
}

/// Named inputs of one structured task, rendered once before the retry loop
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskInput {
    values: BTreeMap<String, InputValue>,
}

impl TaskInput {
    /// Empty input mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the value for `name`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Render every value to text
    pub fn render(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(name, value)| (name.clone(), value.render()))
            .collect()
    }
}
