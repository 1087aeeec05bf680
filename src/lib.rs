//! # Invox
//!
//! An invoice parsing HTTP service: upload a document, get back a structured
//! invoice extracted by a vision/language model.
//!
//! ## Features
//!
//! - **One-Shot Extraction**: `POST /extract` takes a multipart upload and returns structured JSON
//! - **Per-Format Handling**: images go through vision, `.docx` is parsed locally, everything else through the provider file store
//! - **Language Gate**: reliably non-English text is translated to English before parsing
//! - **Schema-Constrained Parsing**: the model output is forced through a JSON schema, then normalized
//! - **Swappable Provider**: the model vendor sits behind a trait, so tests run against fakes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use invox::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     invox::server::serve(settings).await
//! }
//! ```

pub mod config;
pub mod core;
pub mod extract;
pub mod invoice;
pub mod parse;
pub mod provider;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Config ===
    pub use crate::config::{SchemaVariant, Settings};

    // === Errors ===
    pub use crate::core::{ApiError, ApiResult, ConfigError, ErrorResponse, UploadError};

    // === Pipeline ===
    pub use crate::extract::{FileKind, TextExtractor};
    pub use crate::invoice::{ExtractResponse, Invoice, InvoiceClientType, ServiceAndItem};
    pub use crate::parse::{InvoiceParser, invoice_schema, normalize_invoice_payload};
    pub use crate::provider::{ModelProvider, OpenAiProvider, ProviderError};

    // === Server ===
    pub use crate::server::{AppState, build_router};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;

    // === Axum ===
    pub use axum::{
        Json, Router,
        extract::{Multipart, State},
        routing::{get, post},
    };
}
