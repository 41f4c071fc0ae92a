//! Ollama chat API client

use super::{GenerationRequest, TextGenerator, TextStream};
use crate::config::{LlmConfig, RetryConfig};
use crate::error::GenerationError;
use crate::retry::with_retry;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client for an Ollama-compatible `/api/chat` endpoint
///
/// The endpoint comes from each request, so one client serves every model
/// option set.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    /// Create a client using the timeout and backoff settings from `config`
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
            retry: config.retry.clone(),
        })
    }

    async fn send_chat(
        &self,
        url: &str,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, GenerationError> {
        let body = ChatRequest {
            model: &request.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            stream,
            options: ChatOptions {
                temperature: request.temperature,
            },
        };

        let result = tokio::time::timeout(
            self.timeout,
            self.client.post(url).json(&body).send(),
        )
        .await;

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_connect() => {
                return Err(GenerationError::Connection(request.base_url.clone()));
            }
            Ok(Err(e)) if e.is_timeout() => return Err(GenerationError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(GenerationError::Http(e.to_string())),
            Err(_) => return Err(GenerationError::Timeout(self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", base_url.trim_end_matches('/'))
}

/// Decode one newline-delimited chunk: `(text, done)`, or `None` for a blank line
fn parse_chunk(line: &[u8]) -> Result<Option<(String, bool)>, GenerationError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: ChatResponse = serde_json::from_str(line)
        .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;
    if let Some(error) = chunk.error {
        return Err(GenerationError::Model(error));
    }

    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok(Some((text, chunk.done)))
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = chat_url(&request.base_url);
        let url = url.as_str();

        let response = with_retry(&self.retry, request.transport_retries, move || {
            self.send_chat(url, request, false)
        })
        .await?;

        let body = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))?
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(GenerationError::Model(error));
        }

        let message = parsed.message.ok_or_else(|| {
            GenerationError::ResponseParsing("response has no message".to_string())
        })?;

        tracing::debug!(
            model = %request.model,
            chars = message.content.len(),
            "generation complete"
        );

        Ok(message.content)
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<TextStream, GenerationError> {
        let url = chat_url(&request.base_url);
        let url = url.as_str();

        let response = with_retry(&self.retry, request.transport_retries, move || {
            self.send_chat(url, request, true)
        })
        .await?;

        let mut bytes = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| GenerationError::Http(e.to_string()))?;
                buffer.extend_from_slice(&chunk);

                while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    if let Some((text, done)) = parse_chunk(&line)? {
                        if !text.is_empty() {
                            yield text;
                        }
                        if done {
                            finished = true;
                            break 'read;
                        }
                    }
                }
            }

            // Final line without a trailing newline
            if !finished {
                if let Some((text, _)) = parse_chunk(&buffer)? {
                    if !text.is_empty() {
                        yield text;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
