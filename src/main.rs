//! Invoice parsing API entry point.

use invox::config::Settings;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invox=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    if settings.api_key.is_none() {
        // The server still boots; extraction requests fail until a key is set.
        warn!("OPENAI_API_KEY is not set, extraction requests will be rejected");
    }

    invox::server::serve(settings).await
}
