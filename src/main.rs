//! comment-moderator server
//!
//! Loads `.env`, reads configuration from the environment, and serves the
//! REST API until SIGINT or SIGTERM.

use comment_moderator::{AppState, Config, api};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the process environment still applies
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("comment_moderator=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let state = AppState::from_config(config)?;

    api::start_api_server(state).await?;

    Ok(())
}
