//! Authentication middleware for the REST API
//!
//! Optional API key authentication via the X-Api-Key header. When
//! `ApiConfig::api_key` is set, protected routes require a matching header or
//! answer 401 Unauthorized.

use crate::error::ApiError;
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Reject requests whose X-Api-Key header does not match the configured key
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use comment_moderator::api::auth::require_api_key;
///
/// let api_key = Some("secret-key-123".to_string());
/// let router: Router = Router::new()
///     .layer(middleware::from_fn_with_state(
///         api_key,
///         require_api_key
///     ));
/// ```
pub async fn require_api_key(
    State(expected_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = expected_api_key else {
        return next.run(request).await;
    };

    let api_key_header = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match api_key_header {
        Some(provided_key)
            if constant_time_eq(provided_key.as_bytes(), expected_key.as_bytes()) =>
        {
            next.run(request).await
        }
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing X-Api-Key header"),
    }
}

/// Compares every byte regardless of where the first mismatch occurs
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(message))).into_response()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, middleware, routing::get};
    use tower::ServiceExt; // for oneshot

    async fn ok_handler() -> impl IntoResponse {
        (StatusCode::OK, "Success")
    }

    fn app(api_key: Option<&str>) -> Router {
        Router::new()
            .route("/test", get(ok_handler))
            .layer(middleware::from_fn_with_state(
                api_key.map(str::to_string),
                require_api_key,
            ))
    }

    async fn status_with_header(api_key: Option<&str>, header: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri("/test");
        if let Some(value) = header {
            request = request.header("X-Api-Key", value);
        }
        let response = app(api_key)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn no_key_configured_allows_everything() {
        assert_eq!(status_with_header(None, None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn matching_key_passes() {
        assert_eq!(
            status_with_header(Some("s3cret"), Some("s3cret")).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn wrong_or_differently_cased_key_is_rejected() {
        assert_eq!(
            status_with_header(Some("s3cret"), Some("nope")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_with_header(Some("CaseKey"), Some("casekey")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_with_header(Some("key "), Some("key")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn missing_header_names_the_header() {
        let response = app(Some("required"))
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "unauthorized");
        assert_eq!(error.error, "Missing X-Api-Key header");
    }
}
