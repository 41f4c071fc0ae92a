//! Configuration types for comment-moderator

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// Default language model when none is configured
pub const DEFAULT_MODEL: &str = "gemma2:2b";

/// Default local inference endpoint
pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default number of structured task attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Deployment environment, selects which endpoint variables are read
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (reads the `_DEV` endpoint variables)
    #[default]
    Development,
    /// Production (reads the `_PROD` endpoint variables)
    Production,
}

/// Main configuration for the moderation service
///
/// Fields are organized into logical sub-configs:
/// - [`server`](ServerIntegrationConfig) - REST API binding and access control
/// - [`llm`](LlmConfig) - language model endpoint and structured task defaults
/// - [`storage`](StorageConfig) - external moderation-storage endpoint
/// - [`events`](EventsConfig) - subscriber channel tuning
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,

    /// Language model settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Moderation-storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Subscriber channel settings
    #[serde(default)]
    pub events: EventsConfig,
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5001)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Language model configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Ollama-compatible server (default: http://localhost:11434)
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier (default: gemma2:2b)
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (default: 0.7)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Structured task attempts before giving up (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Transport-level retries inside a single generation call (default: 2)
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,

    /// Timeout for a single generation request (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Backoff settings for transport-level retries
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            max_retries: DEFAULT_MAX_RETRIES,
            transport_retries: default_transport_retries(),
            request_timeout: default_request_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient transport failures
///
/// The attempt budget is not part of this struct; it comes from the per-call
/// retry hint carried by each generation request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// External moderation-storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage site; the moderation path is appended to it
    #[serde(default)]
    pub base_url: Option<String>,

    /// Optional authentication header value
    #[serde(default)]
    pub auth_header: Option<String>,

    /// Timeout for storage requests (default: 30 seconds)
    #[serde(default = "default_storage_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_header: None,
            timeout: default_storage_timeout(),
        }
    }
}

/// Subscriber channel configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Events buffered per subscriber before new ones are dropped (default: 64)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Interval between SSE keep-alive comments (default: 15 seconds)
    #[serde(default = "default_keep_alive", with = "duration_serde")]
    pub keep_alive: Duration,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            keep_alive: default_keep_alive(),
        }
    }
}

impl Config {
    /// Build configuration from process environment variables.
    ///
    /// The caller is responsible for loading any `.env` file first.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Recognised variables: `PORT`, `APP_ENV` (or `NODE_ENV`), `OLLAMA_API_URL_PROD`,
    /// `OLLAMA_API_URL_DEV`, `OLLAMA_MODEL`, `LLM_MAX_RETRIES`, `WP_API_URL_PROD`,
    /// `WP_API_URL_DEV`, `WP_API_AUTH`, `API_KEY`, `CORS_ORIGINS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("APP_ENV").or_else(|| get("NODE_ENV"));

        if get("PORT").is_none() {
            tracing::warn!(key = "PORT", "missing environment variable, using default");
        }
        if environment.is_none() {
            tracing::warn!(key = "APP_ENV", "missing environment variable, using default");
        }

        let mut config = Config::default();

        config.environment = match environment.as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };
        let suffix = match config.environment {
            Environment::Production => "PROD",
            Environment::Development => "DEV",
        };

        if let Some(port) = get("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| Error::Config {
                message: format!("PORT must be a port number, got '{}'", port),
                key: Some("PORT".to_string()),
            })?;
            config.server.api.bind_address.set_port(port);
        }

        if let Some(url) = get(&format!("OLLAMA_API_URL_{}", suffix)) {
            config.llm.base_url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            config.llm.model = model;
        }
        if let Some(retries) = get("LLM_MAX_RETRIES") {
            config.llm.max_retries = retries.trim().parse().map_err(|_| Error::Config {
                message: format!("LLM_MAX_RETRIES must be an integer, got '{}'", retries),
                key: Some("LLM_MAX_RETRIES".to_string()),
            })?;
        }

        config.storage.base_url = get(&format!("WP_API_URL_{}", suffix));
        config.storage.auth_header = get("WP_API_AUTH");
        config.server.api.api_key = get("API_KEY");

        if let Some(origins) = get("CORS_ORIGINS") {
            config.server.api.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        config.validate()?;

        tracing::info!(
            environment = ?config.environment,
            llm_url = %config.llm.base_url,
            model = %config.llm.model,
            storage_configured = config.storage.base_url.is_some(),
            "loaded configuration"
        );

        Ok(config)
    }

    /// Check values that serde cannot constrain on its own
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.llm.base_url).map_err(|e| Error::Config {
            message: format!("invalid language model URL '{}': {}", self.llm.base_url, e),
            key: Some("llm.base_url".to_string()),
        })?;

        if let Some(base) = &self.storage.base_url {
            url::Url::parse(base).map_err(|e| Error::Config {
                message: format!("invalid storage URL '{}': {}", base, e),
                key: Some("storage.base_url".to_string()),
            })?;
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config {
                message: format!(
                    "temperature must be between 0 and 2, got {}",
                    self.llm.temperature
                ),
                key: Some("llm.temperature".to_string()),
            });
        }

        if self.events.channel_capacity == 0 {
            return Err(Error::Config {
                message: "channel capacity must be at least 1".to_string(),
                key: Some("events.channel_capacity".to_string()),
            });
        }

        if self.events.keep_alive.is_zero() {
            return Err(Error::Config {
                message: "keep-alive interval must be greater than zero".to_string(),
                key: Some("events.keep_alive".to_string()),
            });
        }

        Ok(())
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5001))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_transport_retries() -> u32 {
    2
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_storage_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_channel_capacity() -> usize {
    64
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(15)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gemma2:2b");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.server.api.bind_address.port(), 5001);
        assert!(config.storage.base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert!(config.server.api.api_key.is_none());
    }

    #[test]
    fn development_reads_dev_endpoints() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("APP_ENV", "development"),
            ("OLLAMA_API_URL_DEV", "http://dev-llm:11434"),
            ("OLLAMA_API_URL_PROD", "http://prod-llm:11434"),
            ("WP_API_URL_DEV", "http://dev-wp.local"),
            ("WP_API_URL_PROD", "https://wp.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.server.api.bind_address.port(), 8080);
        assert_eq!(config.llm.base_url, "http://dev-llm:11434");
        assert_eq!(config.storage.base_url.as_deref(), Some("http://dev-wp.local"));
    }

    #[test]
    fn production_reads_prod_endpoints() {
        let config = Config::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("OLLAMA_API_URL_DEV", "http://dev-llm:11434"),
            ("OLLAMA_API_URL_PROD", "http://prod-llm:11434"),
            ("WP_API_URL_PROD", "https://wp.example.com"),
            ("OLLAMA_MODEL", "llama3.2:3b"),
        ]))
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.llm.base_url, "http://prod-llm:11434");
        assert_eq!(config.llm.model, "llama3.2:3b");
        assert_eq!(
            config.storage.base_url.as_deref(),
            Some("https://wp.example.com")
        );
    }

    #[test]
    fn node_env_selects_environment_when_app_env_is_unset() {
        let config = Config::from_lookup(lookup_from(&[
            ("NODE_ENV", "production"),
            ("OLLAMA_API_URL_PROD", "http://prod-llm:11434"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.llm.base_url, "http://prod-llm:11434");

        let config = Config::from_lookup(lookup_from(&[
            ("APP_ENV", "development"),
            ("NODE_ENV", "production"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn zero_keep_alive_fails_validation() {
        let mut config = Config::default();
        config.events.keep_alive = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(ref key), .. }) if key == "events.keep_alive"
        ));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup_from(&[(
            "CORS_ORIGINS",
            "https://a.example.com, https://b.example.com,,",
        )]))
        .unwrap();
        assert_eq!(
            config.server.api.cors_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }

    #[test]
    fn invalid_port_is_config_error() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("PORT")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_storage_url_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("WP_API_URL_DEV", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("llm.temperature")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_channel_capacity_is_rejected() {
        let mut config = Config::default();
        config.events.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"llm": {"model": "phi3", "request_timeout": 10}, "events": {"keep_alive": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "phi3");
        assert_eq!(config.llm.request_timeout, Duration::from_secs(10));
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.events.keep_alive, Duration::from_secs(5));
        assert_eq!(config.events.channel_capacity, 64);
    }
}
