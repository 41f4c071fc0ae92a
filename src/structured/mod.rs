//! Structured generation
//!
//! Turns an unreliable free-text capability into schema-valid values:
//! [`PromptTemplate`] and [`TaskInput`] build the prompt, [`Schema`] validates
//! the answer (with [`recovery`] as a fallback for noisy text), and
//! [`StructuredTaskExecutor`] drives the bounded retry loop.

use crate::types::{CommentAnalysis, ModerationDecision, Sentiment};
use serde::de::DeserializeOwned;

mod executor;
mod input;
mod prompt;
pub mod recovery;
mod schema;

pub use executor::{BestEffort, StructuredTaskExecutor};
pub use input::{InputValue, TaskInput};
pub use prompt::PromptTemplate;
pub use schema::{FieldKind, FieldSpec, Schema};

/// A type the model can be asked to produce
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Shape the model must answer with
    fn schema() -> Schema;

    /// Value substituted by best-effort call sites, if the type has one
    fn fallback() -> Option<Self> {
        None
    }
}

fn sentiment_kind() -> FieldKind {
    FieldKind::Enum(Sentiment::ALL.iter().map(|s| s.to_string()).collect())
}

impl StructuredOutput for ModerationDecision {
    fn schema() -> Schema {
        Schema::new()
            .field(
                "approved",
                FieldKind::Boolean,
                "true if the comment may be published, false if it should be held or rejected",
            )
            .field(
                "reason",
                FieldKind::String,
                "why the comment was rejected; empty string when approved",
            )
            .field("sentiment", sentiment_kind(), "overall tone of the comment")
            .field("title", FieldKind::String, "a short title summarising the comment")
    }
}

impl StructuredOutput for CommentAnalysis {
    fn schema() -> Schema {
        Schema::new()
            .field("sentiment", sentiment_kind(), "overall tone of the comment")
            .field("title", FieldKind::String, "a short title summarising the comment")
            .field(
                "reply",
                FieldKind::String,
                "a friendly, concise reply to post under the comment",
            )
    }

    fn fallback() -> Option<Self> {
        Some(CommentAnalysis::neutral())
    }
}
