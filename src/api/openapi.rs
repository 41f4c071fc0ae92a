//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the comment-moderator REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the comment-moderator REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (backed by `/api-docs/openapi.json`)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "comment-moderator REST API",
        version = "0.1.0",
        description = "AI comment moderation with live per-subscriber status events",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5001", description = "Local development server")
    ),
    paths(
        // Comments
        crate::api::routes::route_status,
        crate::api::routes::moderate_comment,
        crate::api::routes::analyze_comment,
        crate::api::routes::reply_stream,

        // Events
        crate::api::routes::subscribe_events,
        crate::api::routes::broadcast_event,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::SubscriberId,
        crate::types::CommentId,
        crate::types::ThreadMessage,
        crate::types::CommentSubmission,
        crate::types::Sentiment,
        crate::types::ModerationDecision,
        crate::types::CommentAnalysis,
        crate::types::ModerationEvent,

        // API request/response types from routes
        crate::api::routes::RouteStatus,
        crate::api::routes::ModerateResponse,
        crate::api::routes::AnalyzeResponse,
        crate::api::routes::BroadcastResponse,

        // Error types from error.rs
        crate::error::ApiError,
    )),
    tags(
        (name = "comments", description = "Comment moderation, analysis, and reply suggestions"),
        (name = "events", description = "Live moderation events per subscriber"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the API key authentication scheme to the spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
