//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`comments`] - Moderation, analysis, and reply suggestions
//! - [`events`] - Subscriber event streams and broadcast
//! - [`system`] - Health and OpenAPI

use crate::types::{CommentAnalysis, ModerationDecision};
use axum::response::sse::Event as SseEvent;
use serde::Serialize;

mod comments;
mod events;
mod system;

pub use comments::*;
pub use events::*;
pub use system::*;

// ============================================================================
// Response Types (shared across handlers)
// ============================================================================

/// Response for GET /ai-comments
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RouteStatus {
    /// Liveness message
    pub message: String,
}

/// Response for POST /ai-comments and POST /ai-comments/moderate
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ModerateResponse {
    /// Always true; failures use an error status instead
    pub success: bool,
    /// The validated moderation decision
    pub ai: ModerationDecision,
    /// Whether the decision reached moderation storage
    pub stored: bool,
}

/// Response for POST /ai-comments/analyze
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnalyzeResponse {
    /// Always true; analysis never fails once the comment is present
    pub success: bool,
    /// Sentiment, title, and suggested reply
    pub ai: CommentAnalysis,
    /// True when the model failed and the neutral default was returned
    pub fallback: bool,
}

/// Response for POST /ai-comments/events/broadcast
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BroadcastResponse {
    /// Number of subscribers that accepted the event
    pub delivered: usize,
}

/// One `data: <json>` frame, or `None` if the value cannot be serialized
pub(crate) fn sse_frame<T: Serialize>(value: &T) -> Option<SseEvent> {
    match serde_json::to_string(value) {
        Ok(json) => Some(SseEvent::default().data(json)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize event to JSON");
            None
        }
    }
}
