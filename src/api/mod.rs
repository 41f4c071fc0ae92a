//! REST API server module
//!
//! Axum router for comment moderation, live subscriber events, and an
//! OpenAPI description of both.

use crate::error::{Error, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod extract;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Where Swagger UI loads its copy of the OpenAPI document
///
/// Kept outside `/api/v1` so it never collides with the versioned
/// `/api/v1/openapi.json` route.
pub const SWAGGER_SPEC_PATH: &str = "/api-docs/openapi.json";

/// Create the API router with all route definitions
///
/// # Routes
///
/// All under `/api/v1`:
///
/// ## Comments
/// - `GET /ai-comments` - Route liveness check
/// - `POST /ai-comments` - Moderate a comment
/// - `POST /ai-comments/moderate` - Moderate a comment
/// - `POST /ai-comments/analyze` - Best-effort analysis with suggested reply
/// - `POST /ai-comments/reply` - Stream a suggested reply (SSE)
///
/// ## Events
/// - `GET /ai-comments/events/:user_id` - Moderation events for one subscriber (SSE)
/// - `POST /ai-comments/events/broadcast` - Push an event to every subscriber
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
///
/// Swagger UI is served at `/swagger-ui` (spec at [`SWAGGER_SPEC_PATH`]) when
/// enabled. When an API key is configured every route except the event stream
/// requires `X-Api-Key`, since browser `EventSource` clients cannot send headers.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let protected = Router::new()
        // Comments
        .route(
            "/ai-comments",
            get(routes::route_status).post(routes::moderate_comment),
        )
        .route("/ai-comments/moderate", post(routes::moderate_comment))
        .route("/ai-comments/analyze", post(routes::analyze_comment))
        .route("/ai-comments/reply", post(routes::reply_stream))
        // Events
        .route(
            "/ai-comments/events/broadcast",
            post(routes::broadcast_event),
        )
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    let protected = match &config.server.api.api_key {
        Some(api_key) => protected.layer(middleware::from_fn_with_state(
            Some(api_key.clone()),
            auth::require_api_key,
        )),
        None => protected,
    };

    let public = Router::new().route(
        "/ai-comments/events/:user_id",
        get(routes::subscribe_events),
    );

    let router = Router::new().nest("/api/v1", protected.merge(public));

    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url(SWAGGER_SPEC_PATH, ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        router.layer(build_cors_layer(&config.server.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until SIGINT or SIGTERM (Ctrl+C on other platforms), then stops
/// accepting connections, closes every subscriber channel, and waits for
/// in-flight requests.
///
/// # Example
///
/// ```no_run
/// use comment_moderator::{AppState, Config};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let state = AppState::from_config(Config::default())?;
///
/// // Start API server (blocks until shutdown)
/// comment_moderator::api::start_api_server(state).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(state: AppState) -> Result<()> {
    let bind_address = state.config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    serve(listener, state, wait_for_signal()).await
}

/// Serve the API on `listener` until `shutdown` completes
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr().map_err(Error::Io)?;
    let registry = state.registry().clone();
    let app = create_router(state);

    tracing::info!(address = %address, "API server listening");

    let shutdown_registry = registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            // Ends every event stream so graceful shutdown can complete
            shutdown_registry.clear();
        })
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    registry.clear();
    tracing::info!("API server stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal handlers may fail to register in restricted environments
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
