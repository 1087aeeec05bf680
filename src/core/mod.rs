//! Core module containing the shared error types for the service

pub mod error;

pub use error::{ApiError, ApiResult, ConfigError, ErrorResponse, UploadError};
