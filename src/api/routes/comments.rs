//! Comment handlers: moderation, analysis, and streamed replies.

use super::{AnalyzeResponse, ModerateResponse, RouteStatus, sse_frame};
use crate::api::AppState;
use crate::api::extract::ApiJson;
use crate::error::Error;
use crate::types::CommentSubmission;
use axum::{
    Json,
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;

/// Sent to the client when a reply stream breaks off
const REPLY_FAILED: &str = "Failed to generate reply";

/// GET /ai-comments - Route liveness check
#[utoipa::path(
    get,
    path = "/api/v1/ai-comments",
    tag = "comments",
    responses(
        (status = 200, description = "Route is working", body = RouteStatus)
    )
)]
pub async fn route_status() -> Json<RouteStatus> {
    Json(RouteStatus {
        message: "AI Comments route is working".to_string(),
    })
}

/// POST /ai-comments/moderate - Moderate a comment
///
/// Pushes `analyzing` and then `done` or `failed` to the subscriber named by
/// `userId`. A storage failure still answers 200 with `stored: false`.
#[utoipa::path(
    post,
    path = "/api/v1/ai-comments/moderate",
    tag = "comments",
    request_body = CommentSubmission,
    responses(
        (status = 200, description = "Comment moderated", body = ModerateResponse),
        (status = 400, description = "Comment missing or blank, or body is not JSON", body = crate::error::ApiError),
        (status = 500, description = "Failed to analyze comment", body = crate::error::ApiError)
    )
)]
pub async fn moderate_comment(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<CommentSubmission>,
) -> Result<Json<ModerateResponse>, Error> {
    let outcome = state.moderator.moderate(submission).await?;

    Ok(Json(ModerateResponse {
        success: true,
        stored: outcome.stored(),
        ai: outcome.decision,
    }))
}

/// POST /ai-comments/analyze - Best-effort sentiment, title, and reply
#[utoipa::path(
    post,
    path = "/api/v1/ai-comments/analyze",
    tag = "comments",
    request_body = CommentSubmission,
    responses(
        (status = 200, description = "Analysis, or the neutral default", body = AnalyzeResponse),
        (status = 400, description = "Comment missing or blank, or body is not JSON", body = crate::error::ApiError)
    )
)]
pub async fn analyze_comment(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<CommentSubmission>,
) -> Result<Json<AnalyzeResponse>, Error> {
    let analysis = state.moderator.analyze(&submission).await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        ai: analysis.value,
        fallback: analysis.fallback,
    }))
}

/// POST /ai-comments/reply - Stream a suggested reply
///
/// Frames are `{"chunk": "..."}` per piece of text, then `{"done": true}`.
/// A failure mid-stream sends `{"error": "..."}` and ends the stream.
#[utoipa::path(
    post,
    path = "/api/v1/ai-comments/reply",
    tag = "comments",
    request_body = CommentSubmission,
    responses(
        (status = 200, description = "Reply stream (text/event-stream)", content_type = "text/event-stream"),
        (status = 400, description = "Comment missing or blank, or body is not JSON", body = crate::error::ApiError),
        (status = 500, description = "Failed to generate reply", body = crate::error::ApiError)
    )
)]
pub async fn reply_stream(
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<CommentSubmission>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, Error> {
    let mut chunks = state.moderator.stream_reply(&submission).await?;

    let stream = async_stream::stream! {
        let mut failed = false;

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => {
                    if let Some(frame) = sse_frame(&json!({ "chunk": text })) {
                        yield Ok(frame);
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "reply stream failed");
                    if let Some(frame) = sse_frame(&json!({ "error": REPLY_FAILED })) {
                        yield Ok(frame);
                    }
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            if let Some(frame) = sse_frame(&json!({ "done": true })) {
                yield Ok(frame);
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
