//! Text generation capability
//!
//! The structured task engine treats the language model as a black box that
//! turns a rendered prompt into text. [`TextGenerator`] is that seam;
//! [`OllamaClient`] is the production implementation.

use crate::config::{
    DEFAULT_LLM_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_MODEL, DEFAULT_TEMPERATURE, LlmConfig,
};
use crate::error::GenerationError;
use async_trait::async_trait;
use futures::stream::BoxStream;

mod ollama;

pub use ollama::OllamaClient;

/// Text chunks in arrival order
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// Model options for one structured task or generation call
///
/// Fixed for the whole retry loop of a task once chosen.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOptions {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Base URL of the inference server
    pub base_url: String,
    /// Structured task attempts before giving up
    pub max_retries: u32,
    /// Transport-level retry hint passed to each generation call
    pub transport_retries: u32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            transport_retries: 2,
        }
    }
}

impl From<&LlmConfig> for ModelOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            transport_retries: config.transport_retries,
        }
    }
}

impl ModelOptions {
    /// Override the attempt budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build a generation request for `prompt` under these options
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            base_url: self.base_url.clone(),
            prompt: prompt.into(),
            transport_retries: self.transport_retries,
        }
    }
}

/// A single call to the generation capability
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Base URL of the inference server
    pub base_url: String,
    /// Fully rendered prompt
    pub prompt: String,
    /// How many times the transport may retry this call internally
    pub transport_retries: u32,
}

/// Black-box text completion capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce the complete response text in one piece
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Produce the response as chunks, ending when the model signals completion
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<TextStream, GenerationError>;
}
