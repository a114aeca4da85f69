//! Error Types
//!
//! Uniform caller-facing error shape plus the configuration and storage
//! error hierarchies used inside the client.

pub mod normalize;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub use normalize::{
    normalize_failure, normalize_response, RawFailure, GENERIC_ERROR_MESSAGE,
    SERVICE_UNAVAILABLE_STATUS,
};

/// HTTP status signalling an authentication failure.
pub const UNAUTHORIZED_STATUS: u16 = 401;

/// Status used for local failures that never reached the network layer
/// (storage and similar).
pub const INTERNAL_ERROR_STATUS: u16 = 500;

/// Message carried by an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    /// Plain message (server supplied or generic).
    Text(String),
    /// Server supplied list of field-level errors.
    FieldErrors(Vec<Value>),
}

impl ErrorMessage {
    /// Text form, if this is a plain message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::FieldErrors(_) => None,
        }
    }

    /// Field errors, if the server reported them.
    pub fn field_errors(&self) -> Option<&[Value]> {
        match self {
            Self::Text(_) => None,
            Self::FieldErrors(errors) => Some(errors),
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::FieldErrors(errors) => {
                let rendered: Vec<String> = errors
                    .iter()
                    .map(|error| {
                        error
                            .get("msg")
                            .or_else(|| error.get("message"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| match error {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                    })
                    .collect();
                f.write_str(&rendered.join("; "))
            }
        }
    }
}

impl From<&str> for ErrorMessage {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ErrorMessage {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Normalized error returned to every caller of the client.
///
/// Always carries a `message` and a `status`. Any other fields supplied by
/// the server in the error body are preserved in `fields` and flattened back
/// out on serialization.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub message: ErrorMessage,
    pub status: u16,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ApiError {
    /// Create an error with a text message and status.
    pub fn new(message: impl Into<ErrorMessage>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
            fields: Map::new(),
        }
    }

    /// Generic error for a response that carried no usable detail.
    pub fn generic(status: u16) -> Self {
        Self::new(GENERIC_ERROR_MESSAGE, status)
    }

    /// Generic error for a request that never received a response.
    pub fn service_unavailable() -> Self {
        Self::generic(SERVICE_UNAVAILABLE_STATUS)
    }

    /// Attach an extra field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a preserved server field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether this error is an HTTP 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status == UNAUTHORIZED_STATUS
    }

    /// Message rendered as a single string.
    pub fn message_text(&self) -> String {
        self.message.to_string()
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        Self::generic(INTERNAL_ERROR_STATUS).with_field("reason", error.to_string())
    }
}

/// Result type for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable {name} is not set")]
    MissingEnvironment { name: String },

    #[error("Failed to build HTTP client: {message}")]
    HttpClient { message: String },
}

/// Credential store error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Read failed for {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("Write failed for {key}: {message}")]
    WriteFailed { key: String, message: String },

    #[error("Delete failed for {key}: {message}")]
    DeleteFailed { key: String, message: String },

    #[error("Corrupted credential data: {message}")]
    CorruptedData { message: String },
}
