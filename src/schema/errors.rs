//! Error taxonomy for form columns
//!
//! Error codes:
//! - FORM_VALIDATION_FAILED (raw data violates a field rule, on write or read)
//! - FORM_UNKNOWN_VARIANT (discriminator tag or runtime variant not registered)
//! - FORM_CONFIGURATION (invalid schema, family or binding declaration)
//! - FORM_MALFORMED_JSON (stored text column is not JSON)

use serde_json::Value;
use thiserror::Error;

/// Result type for form operations
pub type FormResult<T> = Result<T, FormError>;

/// Errors raised by schemas, codecs, resolvers and column bindings.
///
/// Every failure is immediate. Nothing in the adapter retries or swallows one.
#[derive(Debug, Error)]
pub enum FormError {
    /// Field-level validation failure
    #[error("{path} - {reason}")]
    Validation {
        /// Field path (e.g. "a", "c[1]", "d.key")
        path: String,
        /// Human-readable reason, including the offending raw value
        reason: String,
    },

    /// Discriminator tag (on read) or runtime variant (on write) not registered
    #[error("'{variant}' is not a registered variant of '{family}'")]
    UnknownVariant {
        /// Abstract schema name
        family: String,
        /// The unknown tag or variant name
        variant: String,
    },

    /// Schema, family or binding declared incorrectly
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stored text could not be parsed as JSON
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

impl FormError {
    /// Validation failure reporting the raw value, e.g. `a - "[]" is not an integer`.
    pub fn invalid(path: impl Into<String>, raw: &Value, reason: impl AsRef<str>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: format!("\"{}\" {}", render_raw(raw), reason.as_ref()),
        }
    }

    /// Validation failure for a required field that was not supplied.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: "missing".into(),
        }
    }

    /// Validation failure without a raw value to report.
    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_variant(family: impl Into<String>, variant: impl Into<String>) -> Self {
        Self::UnknownVariant {
            family: family.into(),
            variant: variant.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "FORM_VALIDATION_FAILED",
            Self::UnknownVariant { .. } => "FORM_UNKNOWN_VARIANT",
            Self::Configuration(_) => "FORM_CONFIGURATION",
            Self::MalformedJson(_) => "FORM_MALFORMED_JSON",
        }
    }

    /// Returns the field path of a validation failure
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Validation { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_unknown_variant(&self) -> bool {
        matches!(self, Self::UnknownVariant { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Renders a raw value for error messages. Strings are shown without JSON quoting.
fn render_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
