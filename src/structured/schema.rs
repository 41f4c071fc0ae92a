//! Target schemas for structured tasks
//!
//! A [`Schema`] is a small declarative description of a flat JSON object. It
//! compiles to a JSON Schema document, which is both shown to the model as the
//! format instructions and used to validate what comes back.

use super::recovery::extract_json_object;
use crate::error::TaskError;
use serde_json::{Map, Value, json};

/// Type of one field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Any string
    String,
    /// `true` or `false`
    Boolean,
    /// One of a fixed set of strings
    Enum(Vec<String>),
}

/// One field of a [`Schema`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON key
    pub name: String,
    /// Value type
    pub kind: FieldKind,
    /// Whether the key must be present
    pub required: bool,
    /// Guidance for the model
    pub description: String,
}

/// Declared shape of a structured result
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field
    pub fn field(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        });
        self
    }

    /// Add an optional field
    pub fn optional(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        });
        self
    }

    /// Declared fields in order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Equivalent JSON Schema document
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut property = match &field.kind {
                FieldKind::String => json!({"type": "string"}),
                FieldKind::Boolean => json!({"type": "boolean"}),
                FieldKind::Enum(values) => json!({"type": "string", "enum": values}),
            };
            if !field.description.is_empty() {
                property["description"] = Value::String(field.description.clone());
            }
            properties.insert(field.name.clone(), property);

            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Instructions telling the model how to shape its answer
    pub fn format_instructions(&self) -> String {
        let schema = serde_json::to_string(&self.to_json_schema()).unwrap_or_default();
        format!(
            "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n\
             As an example, for the schema {{\"properties\": {{\"foo\": {{\"type\": \"string\"}}}}, \"required\": [\"foo\"]}}\n\
             the object {{\"foo\": \"bar\"}} is a well-formatted instance of the schema. \
             The object {{\"properties\": {{\"foo\": \"bar\"}}}} is not well-formatted.\n\n\
             Here is the output schema:\n```\n{schema}\n```"
        )
    }

    /// Check field presence, types, and enumerated values
    ///
    /// Keys the schema does not mention are allowed.
    pub fn validate(&self, value: &Value) -> Result<(), TaskError> {
        let document = self.to_json_schema();
        let validator = jsonschema::validator_for(&document)
            .map_err(|e| TaskError::InvalidSchema(e.to_string()))?;

        let messages: Vec<String> = validator
            .iter_errors(value)
            .take(3)
            .map(|err| {
                let path = err.instance_path.to_string();
                if path.is_empty() {
                    err.to_string()
                } else {
                    format!("{} at {}", err, path)
                }
            })
            .collect();

        if messages.is_empty() {
            Ok(())
        } else {
            Err(TaskError::Validation(messages.join("; ")))
        }
    }

    /// Parse raw model text and validate it
    ///
    /// Tries the whole text as one JSON object first, then the outermost
    /// brace-delimited span. A value that parses strictly and conforms is
    /// returned unchanged.
    pub fn validate_text(&self, text: &str) -> Result<Value, TaskError> {
        let value = parse_object(text)?;
        self.validate(&value)?;
        Ok(value)
    }
}

fn parse_object(text: &str) -> Result<Value, TaskError> {
    let strict_error = match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => return Ok(value),
        Ok(other) => format!("expected a JSON object, got {}", json_kind(&other)),
        Err(e) => e.to_string(),
    };

    let recovered = extract_json_object(text)
        .and_then(|span| serde_json::from_str::<Value>(span).ok())
        .filter(Value::is_object);
    if let Some(value) = recovered {
        tracing::debug!("recovered JSON object from surrounding text");
        return Ok(value);
    }

    Err(TaskError::Parse(strict_error))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn analysis_schema() -> Schema {
        Schema::new()
            .field(
                "sentiment",
                FieldKind::Enum(vec!["positive".into(), "neutral".into(), "negative".into()]),
                "overall tone",
            )
            .field("title", FieldKind::String, "short title")
            .optional("reply", FieldKind::String, "")
    }

    #[test]
    fn json_schema_lists_required_fields_and_enums() {
        let document = analysis_schema().to_json_schema();
        assert_eq!(document["type"], "object");
        assert_eq!(document["required"], json!(["sentiment", "title"]));
        assert_eq!(document["properties"]["sentiment"]["enum"][2], "negative");
        assert_eq!(document["properties"]["title"]["description"], "short title");
        assert!(document["properties"]["reply"].get("description").is_none());
    }

    #[test]
    fn conforming_text_is_returned_unchanged() {
        let text = r#"{"sentiment": "positive", "title": "Great", "extra": [1, 2]}"#;
        let value = analysis_schema().validate_text(text).unwrap();
        assert_eq!(value, serde_json::from_str::<Value>(text).unwrap());
    }

    #[test]
    fn object_is_recovered_from_prose() {
        let text = r#"Here you go: {"sentiment": "neutral", "title": "Meh"} cheers"#;
        let value = analysis_schema().validate_text(text).unwrap();
        assert_eq!(value["title"], "Meh");
    }

    #[test]
    fn unparseable_text_is_a_parse_error() {
        let err = analysis_schema().validate_text("I cannot help").unwrap_err();
        assert!(matches!(err, TaskError::Parse(_)));

        let err = analysis_schema().validate_text("[1, 2]").unwrap_err();
        assert!(matches!(err, TaskError::Parse(msg) if msg.contains("array")));
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let err = analysis_schema()
            .validate_text(r#"{"sentiment": "neutral"}"#)
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(msg) if msg.contains("title")));
    }

    #[test]
    fn wrong_type_and_enum_are_validation_errors() {
        let schema = analysis_schema().field("approved", FieldKind::Boolean, "");

        let err = schema
            .validate_text(r#"{"sentiment": "angry", "title": "x", "approved": true}"#)
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(msg) if msg.contains("/sentiment")));

        let err = schema
            .validate_text(r#"{"sentiment": "neutral", "title": "x", "approved": "yes"}"#)
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(msg) if msg.contains("/approved")));
    }

    #[test]
    fn format_instructions_embed_the_schema() {
        let instructions = analysis_schema().format_instructions();
        assert!(instructions.contains("\"sentiment\""));
        assert!(instructions.contains("\"enum\":[\"positive\",\"neutral\",\"negative\"]"));
    }
}
