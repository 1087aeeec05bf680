//! Model provider abstraction.
//!
//! Defines the [`ModelProvider`] trait: the narrow set of capabilities this
//! service needs from a hosted language model. The OpenAI-backed client in
//! [`openai`] is the production implementation; tests substitute fakes.

pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use openai::OpenAiProvider;

/// Failures raised by a model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The key check runs before any request is constructed.
    #[error(
        "OPENAI_API_KEY is not set. Set the OPENAI_API_KEY environment variable before starting the service."
    )]
    MissingApiKey,

    /// The provider answered with a non-success status.
    #[error("provider request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a usable HTTP exchange.
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered successfully but with no output text.
    #[error("provider returned no usable output from {call}")]
    EmptyOutput { call: &'static str },

    /// The model's output text was not the JSON it was constrained to.
    #[error("failed to decode model output as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Async trait implemented by each model backend.
///
/// Any provider offering equivalent operations is substitutable; the rest of
/// the crate never sees vendor wire formats.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short identifier carried on wiring log events.
    fn name(&self) -> &str;

    /// Extract all readable text from an image upload.
    async fn image_text(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError>;

    /// Extract all readable text from a generic document upload (PDF etc.).
    async fn document_text(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError>;

    /// Translate arbitrary text to English, returning plain text.
    async fn translate_to_english(&self, text: &str) -> Result<String, ProviderError>;

    /// Ask the model for an invoice-shaped JSON object constrained by `schema`.
    async fn structured_invoice(
        &self,
        text: &str,
        schema: &Value,
    ) -> Result<Value, ProviderError>;
}
