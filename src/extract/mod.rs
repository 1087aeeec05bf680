//! Upload text extraction
//!
//! Classifies the upload into a [`FileKind`] once, hands it to that kind's
//! handler, then applies the language gate: reliably non-English text is
//! translated to English through the provider before it reaches the parser.

pub mod docx;

use crate::core::error::ApiError;
use crate::provider::ModelProvider;
use axum::body::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use whatlang::Lang;

/// What kind of upload a filename points at, decided once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.jpg` / `.jpeg` / `.png`, handled by the vision completion.
    Image,
    /// `.docx`, parsed locally without a provider call.
    WordDocument,
    /// Everything else (PDF and friends), via the provider file store.
    Generic,
}

impl FileKind {
    /// Classify by filename extension, case-insensitive.
    pub fn classify(filename: &str) -> FileKind {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("jpg") | Some("jpeg") | Some("png") => FileKind::Image,
            Some("docx") => FileKind::WordDocument,
            _ => FileKind::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::WordDocument => "word-document",
            FileKind::Generic => "generic",
        }
    }
}

/// Turns an upload into plain English text.
pub struct TextExtractor {
    provider: Arc<dyn ModelProvider>,
}

impl TextExtractor {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Extract text from an upload, translating to English when needed.
    pub async fn extract(&self, filename: &str, bytes: Bytes) -> Result<String, ApiError> {
        let kind = FileKind::classify(filename);
        debug!(
            filename,
            kind = kind.as_str(),
            size = bytes.len(),
            "classified upload"
        );

        let text = match kind {
            FileKind::Image => self.provider.image_text(filename, &bytes).await?,
            FileKind::WordDocument => docx::paragraph_text(bytes).await?,
            FileKind::Generic => self.provider.document_text(filename, &bytes).await?,
        };

        self.ensure_english(text).await
    }

    /// Translate reliably-detected non-English text; everything else passes
    /// through untouched, including blank text.
    async fn ensure_english(&self, text: String) -> Result<String, ApiError> {
        if text.trim().is_empty() {
            return Ok(text);
        }

        match whatlang::detect(&text) {
            Some(info) if info.is_reliable() && info.lang() != Lang::Eng => {
                info!(
                    detected = info.lang().code(),
                    "translating extracted text to English"
                );
                Ok(self.provider.translate_to_english(&text).await?)
            }
            _ => Ok(text),
        }
    }
}
