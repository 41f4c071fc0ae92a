//! Prompt templates with `{name}` placeholders

use crate::error::TaskError;
use std::collections::BTreeMap;

/// Text with named `{placeholder}` slots
///
/// `{{` and `}}` produce literal braces, which lets templates carry JSON
/// examples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Wrap a template string
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Raw template text
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Append more template text
    pub fn append(mut self, suffix: &str) -> Self {
        self.template.push_str(suffix);
        self
    }

    /// Substitute every placeholder from `vars`
    ///
    /// A `{` without a matching `}` is kept literally.
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String, TaskError> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
            } else {
                match tail[1..].find('}') {
                    Some(end) if is_placeholder(&tail[1..=end]) => {
                        let name = &tail[1..=end];
                        let value = vars
                            .get(name)
                            .ok_or_else(|| TaskError::MissingVariable(name.to_string()))?;
                        out.push_str(value);
                        rest = &tail[end + 2..];
                    }
                    _ => {
                        out.push('{');
                        rest = &tail[1..];
                    }
                }
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl From<&str> for PromptTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}
