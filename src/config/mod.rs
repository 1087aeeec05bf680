//! Environment-based configuration for the invoice parsing service

use crate::core::error::ConfigError;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Default model used when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default provider endpoint used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default listen address used when `BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Which JSON-schema flavor the structured parser constrains the model with.
///
/// `Simple` is the plain invoice schema; `Extended` additionally requires a
/// currency code next to every monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVariant {
    #[default]
    Simple,
    Extended,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::Simple => "simple",
            SchemaVariant::Extended => "extended",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(SchemaVariant::Simple),
            "extended" => Ok(SchemaVariant::Extended),
            _ => Err(ConfigError::InvalidValue {
                var: "INVOICE_SCHEMA_VARIANT".to_string(),
                value: value.to_string(),
                expected: "simple | extended",
            }),
        }
    }
}

/// Runtime settings, read once at startup.
///
/// A missing API key is not a startup error: the server boots and serves the
/// health route, and every `/extract` call fails with an explicit
/// missing-key error until the key is provided.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider API key (`OPENAI_API_KEY`), `None` when unset or blank.
    pub api_key: Option<String>,

    /// Model identifier (`OPENAI_MODEL`).
    pub model: String,

    /// Provider base URL (`OPENAI_BASE_URL`), no trailing slash.
    pub base_url: String,

    /// Invoice schema flavor (`INVOICE_SCHEMA_VARIANT`).
    pub schema_variant: SchemaVariant,

    /// Listen address (`BIND_ADDR`).
    pub bind_addr: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let schema_variant = match non_empty("INVOICE_SCHEMA_VARIANT") {
            Some(value) => value.parse()?,
            None => SchemaVariant::default(),
        };

        Ok(Self {
            api_key: non_empty("OPENAI_API_KEY"),
            model: non_empty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            schema_variant,
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}
