//! Application state for the API server

use crate::channels::ChannelRegistry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{ModelOptions, OllamaClient};
use crate::moderation::{HttpModerationStore, Moderator};
use crate::structured::StructuredTaskExecutor;
use crate::types::ModerationEvent;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Moderation workflow, which owns the channel registry
    pub moderator: Arc<Moderator>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(moderator: Arc<Moderator>, config: Arc<Config>) -> Self {
        Self { moderator, config }
    }

    /// Wire the production components described by `config`
    ///
    /// Validates `config`, then creates the channel registry, the Ollama
    /// client, the structured task executor, and the HTTP moderation store.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let generator = OllamaClient::new(&config.llm).map_err(|e| Error::Config {
            message: format!("cannot build language model client: {e}"),
            key: Some("llm".to_string()),
        })?;

        if config.storage.base_url.is_none() {
            tracing::warn!("moderation storage URL not set, decisions will not be recorded");
        }

        let registry = Arc::new(ChannelRegistry::new());
        let executor =
            StructuredTaskExecutor::new(Arc::new(generator), ModelOptions::from(&config.llm));
        let store = Arc::new(HttpModerationStore::new(&config.storage));
        let moderator = Arc::new(Moderator::new(registry, executor, store));

        Ok(Self::new(moderator, Arc::new(config)))
    }

    /// Registry of live subscriber channels
    pub fn registry(&self) -> &Arc<ChannelRegistry<ModerationEvent>> {
        self.moderator.registry()
    }
}
