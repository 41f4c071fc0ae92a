use super::*;
use crate::channels::ChannelRegistry;
use crate::config::Config;
use crate::llm::ModelOptions;
use crate::moderation::{HttpModerationStore, Moderator};
use crate::structured::StructuredTaskExecutor;
use crate::test_helpers::ScriptedGenerator;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;


const APPROVED: &str =
    r#"{"approved": true, "reason": "", "sentiment": "positive", "title": "Kind words"}"#;

/// State backed by a scripted generator and the storage in `config`
fn test_state(generator: ScriptedGenerator, config: Config) -> (AppState, Arc<ScriptedGenerator>) {
    let generator = Arc::new(generator);
    let executor = StructuredTaskExecutor::new(
        generator.clone(),
        ModelOptions::from(&config.llm).with_max_retries(3),
    );
    let store = Arc::new(HttpModerationStore::new(&config.storage));
    let moderator = Arc::new(Moderator::new(
        Arc::new(ChannelRegistry::new()),
        executor,
        store,
    ));
    (AppState::new(moderator, Arc::new(config)), generator)
}

fn default_state() -> AppState {
    test_state(ScriptedGenerator::always(APPROVED), Config::default()).0
}

fn json_request(method: &str, uri: &str, body: Value) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_subscriber_count() {
    let app = create_router(default_state());

    let response = app.oneshot(get_request("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["subscribers"], 0);
}

#[tokio::test]
async fn openapi_json_is_served() {
    let app = create_router(default_state());

    let response = app.oneshot(get_request("/api/v1/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body["paths"]["/api/v1/ai-comments/moderate"].is_object());
}

#[tokio::test]
async fn default_config_router_serves_swagger_and_versioned_spec() {
    let config = Config::default();
    assert!(config.server.api.swagger_ui);
    let app = create_router(AppState::from_config(config).unwrap());

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(SWAGGER_SPEC_PATH))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/api/v1/ai-comments/moderate"].is_object());

    let response = app.oneshot(get_request("/swagger-ui/")).await.unwrap();
    assert_ne!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn swagger_ui_can_be_disabled() {
    let mut config = Config::default();
    config.server.api.swagger_ui = false;
    let app = create_router(test_state(ScriptedGenerator::always(APPROVED), config).0);

    let response = app.oneshot(get_request("/swagger-ui/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_headers_are_added() {
    let app = create_router(default_state());

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn cors_restricted_to_configured_origins() {
    let mut config = Config::default();
    config.server.api.cors_origins = vec!["https://blog.example.com".to_string()];
    let app = create_router(test_state(ScriptedGenerator::always(APPROVED), config).0);

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "https://blog.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://blog.example.com"
    );
}

#[tokio::test]
async fn api_key_protects_routes_but_not_event_stream() {
    let mut config = Config::default();
    config.server.api.api_key = Some("s3cret".to_string());
    let (state, _) = test_state(ScriptedGenerator::always(APPROVED), config);
    let app = create_router(state.clone());

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("X-Api-Key", "s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/v1/ai-comments/events/user-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.registry().contains(&"user-1".into()));
}

#[tokio::test]
async fn server_shuts_down_gracefully_and_closes_channels() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let state = default_state();
    let registry = state.registry().clone();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, state, async {
        stop_rx.await.ok();
    }));

    let client = reqwest::Client::new();
    let health = client
        .get(format!("http://{address}/api/v1/health"))
        .send()
        .await
        .unwrap();
    assert!(health.status().is_success());

    // An open event stream must not block shutdown
    let events = client
        .get(format!("http://{address}/api/v1/ai-comments/events/user-1"))
        .send()
        .await
        .unwrap();
    assert!(events.status().is_success());
    assert!(registry.contains(&"user-1".into()));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert!(registry.is_empty());
}
