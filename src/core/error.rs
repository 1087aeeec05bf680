//! Typed error handling for the invoice parsing service
//!
//! Every failure a request can hit is represented here so handlers can
//! return `Result<_, ApiError>` and get a consistent JSON error body.
//!
//! # Error Categories
//!
//! - [`UploadError`]: problems with the multipart request itself
//! - [`ProviderError`]: failures talking to the external model provider
//!   (defined in [`crate::provider`], wrapped here)
//! - [`ConfigError`]: invalid environment configuration, fatal at startup

use crate::provider::ProviderError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type for request handling
#[derive(Debug)]
pub enum ApiError {
    /// Problems reading the multipart upload
    Upload(UploadError),

    /// Failures from the external model provider
    Provider(ProviderError),

    /// The normalized model payload does not fit the Invoice shape
    InvalidInvoice { message: String },

    /// Internal errors (blocking-task join failures and the like)
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Upload(e) => write!(f, "{}", e),
            ApiError::Provider(e) => write!(f, "{}", e),
            ApiError::InvalidInvoice { message } => {
                write!(f, "Invoice payload does not match the expected shape: {}", message)
            }
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Upload(e) => Some(e),
            ApiError::Provider(e) => Some(e),
            ApiError::InvalidInvoice { .. } => None,
            ApiError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Upload(e) => e.status_code(),
            ApiError::Provider(e) => match e {
                ProviderError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
                ProviderError::Api { .. }
                | ProviderError::Transport(_)
                | ProviderError::EmptyOutput { .. }
                | ProviderError::Json(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::InvalidInvoice { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Upload(e) => e.error_code(),
            ApiError::Provider(e) => match e {
                ProviderError::MissingApiKey => "MISSING_API_KEY",
                ProviderError::Api { .. } => "UPSTREAM_API_ERROR",
                ProviderError::Transport(_) => "UPSTREAM_TRANSPORT_ERROR",
                ProviderError::EmptyOutput { .. } => "EMPTY_MODEL_OUTPUT",
                ProviderError::Json(_) => "MALFORMED_MODEL_OUTPUT",
            },
            ApiError::InvalidInvoice { .. } => "INVALID_INVOICE_PAYLOAD",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Get additional details for the error
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Upload(UploadError::MissingField { field }) => {
                Some(serde_json::json!({ "field": field }))
            }
            ApiError::Provider(ProviderError::Api { status, .. }) => {
                Some(serde_json::json!({ "upstream_status": status }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Upload Errors
// =============================================================================

/// Errors related to the multipart upload
#[derive(Debug)]
pub enum UploadError {
    /// A required form field was not supplied
    MissingField { field: &'static str },

    /// A form field could not be read from the request body
    UnreadableField { field: String, message: String },

    /// The uploaded word document could not be opened or parsed
    InvalidDocument { message: String },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::MissingField { field } => {
                write!(f, "Missing required form field '{}'", field)
            }
            UploadError::UnreadableField { field, message } => {
                write!(f, "Failed to read form field '{}': {}", field, message)
            }
            UploadError::InvalidDocument { message } => {
                write!(f, "Failed to read word document: {}", message)
            }
        }
    }
}

impl std::error::Error for UploadError {}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::MissingField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::UnreadableField { .. } => StatusCode::BAD_REQUEST,
            UploadError::InvalidDocument { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            UploadError::MissingField { .. } => "MISSING_FIELD",
            UploadError::UnreadableField { .. } => "UNREADABLE_FIELD",
            UploadError::InvalidDocument { .. } => "INVALID_DOCUMENT",
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        ApiError::Upload(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to environment configuration
///
/// These surface at startup, before the listener binds, so they never render
/// as HTTP responses.
#[derive(Debug)]
pub enum ConfigError {
    /// An environment variable holds a value outside its accepted set
    InvalidValue {
        var: String,
        value: String,
        expected: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                var,
                value,
                expected,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for {}: expected {}",
                    value, var, expected
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::Provider(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidInvoice {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for request handling
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = UploadError::MissingField { field: "userID" };
        assert!(err.to_string().contains("userID"));
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_upload_error_status_codes() {
        assert_eq!(
            UploadError::MissingField { field: "file" }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            UploadError::UnreadableField {
                field: "file".to_string(),
                message: "read failed".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UploadError::InvalidDocument {
                message: "not a zip".to_string()
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_missing_api_key_maps_to_500() {
        let err: ApiError = ProviderError::MissingApiKey.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "MISSING_API_KEY");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_upstream_api_error_maps_to_502_with_details() {
        let err: ApiError = ProviderError::Api {
            status: 429,
            message: "rate limited".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "UPSTREAM_API_ERROR");

        let response = err.to_response();
        let details = response.details.expect("api errors should carry details");
        assert_eq!(details["upstream_status"], 429);
    }

    #[test]
    fn test_missing_field_response_details() {
        let err: ApiError = UploadError::MissingField { field: "file" }.into();
        let response = err.to_response();
        assert_eq!(response.code, "MISSING_FIELD");
        assert_eq!(
            response.details.expect("should carry field details")["field"],
            "file"
        );
    }

    #[test]
    fn test_error_response_skips_absent_details() {
        let err = ApiError::Internal("boom".to_string());
        let body = serde_json::to_value(err.to_response()).expect("should serialize");
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let api_err: ApiError = json_err.into();
        assert!(matches!(api_err, ApiError::InvalidInvoice { .. }));
        assert_eq!(api_err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            var: "INVOICE_SCHEMA_VARIANT".to_string(),
            value: "fancy".to_string(),
            expected: "simple | extended",
        };
        let message = err.to_string();
        assert!(message.contains("INVOICE_SCHEMA_VARIANT"));
        assert!(message.contains("fancy"));
        assert!(message.contains("simple | extended"));
    }
}
