//! Subscriber event streams.

use super::{BroadcastResponse, sse_frame};
use crate::api::AppState;
use crate::api::extract::ApiJson;
use crate::channels::{ChannelRegistry, EventSink, SharedSink};
use crate::types::{ModerationEvent, SubscriberId};
use axum::{
    Json,
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::Stream;
use std::convert::Infallible;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// Removes a connection's channel when its stream is dropped
///
/// Holds the sink weakly: the registry owns the only strong handle, so
/// replacing or clearing the channel closes the stream.
struct Subscription {
    registry: Arc<ChannelRegistry<ModerationEvent>>,
    id: SubscriberId,
    sink: Weak<dyn EventSink<ModerationEvent>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // A newer connection for the same id keeps its channel
        if let Some(sink) = self.sink.upgrade() {
            self.registry.unregister_sink(&self.id, &sink);
        }
        tracing::info!(subscriber = %self.id, "subscriber disconnected");
    }
}

/// GET /ai-comments/events/:user_id - Moderation events for one subscriber
///
/// Each event is one `data: <json>` frame. Connecting again with the same id
/// replaces the earlier channel and ends the earlier stream.
#[utoipa::path(
    get,
    path = "/api/v1/ai-comments/events/{user_id}",
    tag = "events",
    params(
        ("user_id" = String, Path, description = "Subscriber identity (user or session id)")
    ),
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn subscribe_events(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let id = SubscriberId::from(user_id);
    let (tx, rx) = mpsc::channel::<ModerationEvent>(state.config.events.channel_capacity);
    let sink: SharedSink<ModerationEvent> = Arc::new(tx);

    let registry = state.registry().clone();
    let weak = Arc::downgrade(&sink);
    registry.register(id.clone(), sink);
    tracing::info!(subscriber = %id, "subscriber connected");

    let subscription = Subscription {
        registry,
        id,
        sink: weak,
    };

    let stream = async_stream::stream! {
        let _subscription = subscription;
        let mut events = ReceiverStream::new(rx);

        while let Some(event) = events.next().await {
            if let Some(frame) = sse_frame(&event) {
                yield Ok(frame);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.events.keep_alive))
}

/// POST /ai-comments/events/broadcast - Push an event to every subscriber
#[utoipa::path(
    post,
    path = "/api/v1/ai-comments/events/broadcast",
    tag = "events",
    request_body = ModerationEvent,
    responses(
        (status = 200, description = "Event broadcast", body = BroadcastResponse),
        (status = 422, description = "Body is not a moderation event", body = crate::error::ApiError)
    )
)]
pub async fn broadcast_event(
    State(state): State<AppState>,
    ApiJson(event): ApiJson<ModerationEvent>,
) -> Json<BroadcastResponse> {
    let delivered = state.moderator.broadcast(&event);
    tracing::debug!(status = event.status(), delivered, "event broadcast");
    Json(BroadcastResponse { delivered })
}
