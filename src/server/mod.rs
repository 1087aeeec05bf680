//! HTTP surface of the invoice parsing service.

pub mod handlers;

use crate::config::{SchemaVariant, Settings};
use crate::extract::TextExtractor;
use crate::parse::InvoiceParser;
use crate::provider::{ModelProvider, OpenAiProvider};
use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Hard cap on multipart upload size.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<TextExtractor>,
    pub parser: Arc<InvoiceParser>,
}

impl AppState {
    /// Wire the state against the OpenAI provider described by settings.
    pub fn new(settings: &Settings) -> Self {
        let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiProvider::new(settings));
        Self::with_provider(provider, settings.schema_variant)
    }

    /// Wire the state against an arbitrary provider. Tests use this to
    /// swap in fakes.
    pub fn with_provider(provider: Arc<dyn ModelProvider>, variant: SchemaVariant) -> Self {
        tracing::info!(
            provider = provider.name(),
            schema = variant.as_str(),
            "wired extraction pipeline"
        );
        Self {
            extractor: Arc::new(TextExtractor::new(provider.clone())),
            parser: Arc::new(InvoiceParser::new(provider, variant)),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/extract", post(handlers::extract_invoice))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API with graceful shutdown
///
/// This will:
/// - Bind to the configured address
/// - Start serving requests
/// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
pub async fn serve(settings: Settings) -> Result<()> {
    let state = AppState::new(&settings);
    let app = build_router(state);
    let listener = TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("Server listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}


/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
