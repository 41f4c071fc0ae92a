//! Error types for comment-moderator
//!
//! This module provides the error taxonomy for the service:
//! - Precondition errors (missing request fields) reported as 4xx
//! - Structured task errors (parse, validation, generation, exhausted retries)
//! - Downstream storage errors
//! - Subscriber delivery errors, which callers absorb rather than propagate
//! - HTTP status code mapping for API integration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for comment-moderator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for comment-moderator
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "llm.base_url")
        key: Option<String>,
    },

    /// A required request field was absent or blank
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Request body could not be read as the expected JSON
    #[error("invalid request body: {message}")]
    InvalidBody {
        /// HTTP status chosen by the JSON extractor (400, 415, or 422)
        status: u16,
        /// Extractor message describing the problem
        message: String,
    },

    /// Structured task failed terminally
    #[error("structured task failed: {0}")]
    Task(#[from] TaskError),

    /// Reply generation could not start
    #[error("reply generation failed: {0}")]
    Reply(#[source] TaskError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Errors raised by the structured task engine
///
/// Every variant except [`TaskError::RetriesExhausted`] is recorded as the
/// "last error" of an attempt and fed back into the next prompt.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Model output could not be parsed as a JSON object, even after recovery
    #[error("response is not valid JSON: {0}")]
    Parse(String),

    /// Parsed output does not satisfy the target schema
    #[error("response does not match schema: {0}")]
    Validation(String),

    /// Prompt template references a placeholder with no value
    #[error("prompt variable `{0}` has no value")]
    MissingVariable(String),

    /// Target schema itself could not be compiled
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The generation capability failed
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Every attempt failed
    #[error("failed after {attempts} retries. last error: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Display form of the last observed error
        last_error: String,
    },
}

/// Errors from the language model transport
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The model server could not be reached
    #[error("cannot connect to language model at {0}")]
    Connection(String),

    /// The request did not complete in time
    #[error("language model request timed out after {0:?}")]
    Timeout(Duration),

    /// The model server answered with a non-success status
    #[error("language model returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// Any other HTTP client failure
    #[error("language model HTTP error: {0}")]
    Http(String),

    /// The response body did not have the expected shape
    #[error("unexpected language model response: {0}")]
    ResponseParsing(String),

    /// The model server reported an error inside a successful response
    #[error("language model reported an error: {0}")]
    Model(String),
}

/// Errors from the external moderation-storage collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    /// No storage base URL is configured
    #[error("moderation storage is not configured")]
    NotConfigured,

    /// The submission carried no comment id to record the decision under
    #[error("no comment id to record the decision under")]
    MissingCommentId,

    /// Storage answered with a non-2xx status
    #[error("moderation storage returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// The request never produced a response
    #[error("moderation storage request failed: {0}")]
    Transport(String),

    /// The request did not complete in time
    #[error("moderation storage timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a subscriber sink refused an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The subscriber disconnected
    #[error("subscriber channel is closed")]
    Closed,

    /// The subscriber is not draining its queue
    #[error("subscriber channel is full")]
    Full,
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": "Failed to analyze comment",
///   "code": "analysis_failed"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code (e.g., "missing_field", "analysis_failed")
    pub code: String,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
        }
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 4xx - precondition failures
            Error::MissingField(_) => 400,
            Error::InvalidBody { status, .. } => *status,

            // 500 Internal Server Error - everything produced on our side
            Error::Task(_) => 500,
            Error::Reply(_) => 500,
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::MissingField(_) => "missing_field",
            Error::InvalidBody { .. } => "invalid_body",
            Error::Task(_) => "analysis_failed",
            Error::Reply(_) => "reply_failed",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl Error {
    /// Message safe to show an external caller.
    ///
    /// Server-side failures collapse to a generic message; the full error is
    /// only ever logged.
    pub fn public_message(&self) -> String {
        match self {
            Error::MissingField(_) => self.to_string(),
            Error::InvalidBody { message, .. } => message.clone(),
            Error::Task(_) => "Failed to analyze comment".to_string(),
            Error::Reply(_) => "Failed to generate reply".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::new(error.error_code(), error.public_message())
    }
}
