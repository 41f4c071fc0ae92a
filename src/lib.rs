//! # comment-moderator
//!
//! AI comment moderation service for a blog backend.
//!
//! A submitted comment is analyzed by a local language model, the answer is
//! validated against a JSON schema (with recovery and bounded retries), the
//! decision is recorded in external storage, and the submitting subscriber is
//! kept informed over a Server-Sent Events stream.
//!
//! ## Quick Start
//!
//! ```no_run
//! use comment_moderator::{AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::from_config(config)?;
//!
//!     // Serve until SIGINT/SIGTERM
//!     comment_moderator::api::start_api_server(state).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Per-subscriber event channels
pub mod channels;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Language model clients
pub mod llm;
/// Comment moderation workflow
pub mod moderation;
/// Retry logic with exponential backoff
pub mod retry;
/// Schema-validated structured generation
pub mod structured;
/// Core types and events
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test_helpers;

// Re-export commonly used types
pub use api::AppState;
pub use channels::{ChannelRegistry, EventSink};
pub use config::Config;
pub use error::{
    ApiError, DeliveryError, Error, GenerationError, Result, StoreError, TaskError, ToHttpStatus,
};
pub use llm::{ModelOptions, OllamaClient, TextGenerator};
pub use moderation::{ModerationOutcome, Moderator, StorageOutcome};
pub use structured::{BestEffort, Schema, StructuredOutput, StructuredTaskExecutor, TaskInput};
pub use types::{
    CommentAnalysis, CommentId, CommentSubmission, ModerationDecision, ModerationEvent,
    Sentiment, SubscriberId, ThreadMessage,
};
