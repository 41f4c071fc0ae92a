//! Recording decisions in the external moderation storage

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::types::{CommentId, ModerationDecision, Sentiment};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Path appended to the storage base URL
pub const MODERATE_PATH: &str = "/wp-json/ai-comments/v1/moderate";

/// Durable destination for validated decisions
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Record `decision` for `comment_id`
    async fn record(
        &self,
        comment_id: Option<&CommentId>,
        decision: &ModerationDecision,
    ) -> Result<(), StoreError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoragePayload<'a> {
    comment_id: &'a CommentId,
    approved: bool,
    reason: &'a str,
    sentiment: Sentiment,
    title: &'a str,
}

/// Posts decisions to a WordPress-style moderation endpoint
pub struct HttpModerationStore {
    client: reqwest::Client,
    url: Option<String>,
    auth_header: Option<String>,
    timeout: Duration,
}

impl HttpModerationStore {
    /// Create a store from storage configuration
    ///
    /// Without a base URL every `record` fails with [`StoreError::NotConfigured`].
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config
                .base_url
                .as_deref()
                .map(|base| format!("{}{}", base.trim_end_matches('/'), MODERATE_PATH)),
            auth_header: config.auth_header.clone(),
            timeout: config.timeout,
        }
    }

    /// Full endpoint URL, if configured
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

#[async_trait]
impl ModerationStore for HttpModerationStore {
    async fn record(
        &self,
        comment_id: Option<&CommentId>,
        decision: &ModerationDecision,
    ) -> Result<(), StoreError> {
        let url = self.url.as_deref().ok_or(StoreError::NotConfigured)?;
        let comment_id = comment_id.ok_or(StoreError::MissingCommentId)?;

        let payload = StoragePayload {
            comment_id,
            approved: decision.approved,
            reason: &decision.reason,
            sentiment: decision.sentiment,
            title: &decision.title,
        };

        let mut request = self.client.post(url).json(&payload).timeout(self.timeout);
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => return Err(StoreError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(StoreError::Transport(e.to_string())),
            Err(_) => return Err(StoreError::Timeout(self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %url, comment_id = %comment_id, "decision recorded");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn decision() -> ModerationDecision {
        ModerationDecision {
            approved: false,
            reason: "contains a spam link".into(),
            sentiment: Sentiment::Neutral,
            title: "Cheap watches".into(),
        }
    }

    fn store_for(server: &MockServer, auth: Option<&str>) -> HttpModerationStore {
        HttpModerationStore::new(&StorageConfig {
            base_url: Some(format!("{}/", server.uri())),
            auth_header: auth.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn posts_camel_case_payload_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODERATE_PATH))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .and(body_json(json!({
                "commentId": 42,
                "approved": false,
                "reason": "contains a spam link",
                "sentiment": "neutral",
                "title": "Cheap watches"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server, Some("Basic dXNlcjpwYXNz"))
            .record(Some(&CommentId::Number(42)), &decision())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODERATE_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("rest_forbidden"))
            .mount(&server)
            .await;

        let err = store_for(&server, None)
            .record(Some(&CommentId::Number(1)), &decision())
            .await
            .unwrap_err();
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "rest_forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_storage_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let store = HttpModerationStore::new(&StorageConfig {
            base_url: Some(server.uri()),
            auth_header: None,
            timeout: Duration::from_millis(100),
        });
        let err = store
            .record(Some(&CommentId::Number(1)), &decision())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
    }

    #[tokio::test]
    async fn unconfigured_store_and_missing_id_fail_without_a_request() {
        let unconfigured = HttpModerationStore::new(&StorageConfig::default());
        assert!(unconfigured.url().is_none());
        assert!(matches!(
            unconfigured
                .record(Some(&CommentId::Number(1)), &decision())
                .await,
            Err(StoreError::NotConfigured)
        ));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        assert!(matches!(
            store_for(&server, None).record(None, &decision()).await,
            Err(StoreError::MissingCommentId)
        ));
    }

    #[test]
    fn url_joins_base_and_path() {
        let store = HttpModerationStore::new(&StorageConfig {
            base_url: Some("https://blog.example.com/".into()),
            ..Default::default()
        });
        assert_eq!(
            store.url(),
            Some("https://blog.example.com/wp-json/ai-comments/v1/moderate")
        );
    }
}
