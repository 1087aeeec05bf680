//! Structured invoice parsing.
//!
//! The parser takes the extracted plain text, hands it to the provider's
//! schema-constrained call and normalizes whatever comes back into a
//! predictable payload.

pub mod normalize;
pub mod schema;

use crate::config::SchemaVariant;
use crate::core::error::ApiError;
use crate::provider::ModelProvider;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

pub use normalize::normalize_invoice_payload;
pub use schema::invoice_schema;

/// Upper bound on the text handed to the structured call.
const MAX_PARSE_BYTES: usize = 60_000;

/// Runs the schema-constrained parsing call and cleans up its output.
pub struct InvoiceParser {
    provider: Arc<dyn ModelProvider>,
    schema: Value,
}

impl InvoiceParser {
    pub fn new(provider: Arc<dyn ModelProvider>, variant: SchemaVariant) -> Self {
        Self {
            provider,
            schema: schema::invoice_schema(variant),
        }
    }

    /// Parse extracted text into a normalized invoice payload.
    pub async fn parse(&self, raw_text: &str) -> Result<Map<String, Value>, ApiError> {
        let clipped = clip_for_model(raw_text);
        let payload = self
            .provider
            .structured_invoice(clipped, &self.schema)
            .await?;
        Ok(normalize::normalize_invoice_payload(payload))
    }
}

/// Clip oversized text on a char boundary so the request stays within the
/// provider's context window.
fn clip_for_model(text: &str) -> &str {
    if text.len() <= MAX_PARSE_BYTES {
        return text;
    }

    let mut end = MAX_PARSE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    warn!(
        original_bytes = text.len(),
        clipped_bytes = end,
        "clipping extracted text before parsing"
    );
    &text[..end]
}
