//! Error Normalizer
//!
//! Maps every raw failure into an [`ApiError`]. The precedence is:
//!
//! 1. server `message` field
//! 2. server `errors` list
//! 3. generic message with the received status
//! 4. generic message with [`SERVICE_UNAVAILABLE_STATUS`] when nothing was received

use serde_json::{Map, Value};

use super::{ApiError, ErrorMessage};

/// Message used when the failure carries no usable detail.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

/// Status reported when no response was received at all.
pub const SERVICE_UNAVAILABLE_STATUS: u16 = 503;

const MESSAGE_FIELD: &str = "message";
const ERRORS_FIELD: &str = "errors";
const STATUS_FIELD: &str = "status";

/// Failure as observed at the transport boundary, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFailure {
    /// The request never produced a response (connect, DNS, TLS, timeout, bad URL).
    NoResponse { reason: String },
    /// A response was received with a failure status.
    Response { status: u16, body: String },
}

impl RawFailure {
    /// Create a no-response failure.
    pub fn no_response(reason: impl Into<String>) -> Self {
        Self::NoResponse {
            reason: reason.into(),
        }
    }

    /// Create a failure from a received response.
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        Self::Response {
            status,
            body: body.into(),
        }
    }
}

/// Normalize a raw failure.
pub fn normalize_failure(failure: &RawFailure) -> ApiError {
    match failure {
        RawFailure::NoResponse { .. } => ApiError::service_unavailable(),
        RawFailure::Response { status, body } => {
            let parsed = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);
            normalize_response(*status, &parsed)
        }
    }
}

/// Normalize a received failure response whose body has already been parsed.
pub fn normalize_response(status: u16, body: &Value) -> ApiError {
    let Some(object) = body.as_object() else {
        return ApiError::generic(status);
    };

    if let Some(message) = object.get(MESSAGE_FIELD).filter(|v| !v.is_null()) {
        let message = match message {
            Value::String(text) => ErrorMessage::Text(text.clone()),
            other => ErrorMessage::Text(other.to_string()),
        };
        return ApiError {
            message,
            status,
            fields: server_fields(object, &[MESSAGE_FIELD]),
        };
    }

    if let Some(Value::Array(errors)) = object.get(ERRORS_FIELD) {
        return ApiError {
            message: ErrorMessage::FieldErrors(errors.clone()),
            status,
            fields: server_fields(object, &[ERRORS_FIELD]),
        };
    }

    ApiError::generic(status)
}

fn server_fields(object: &Map<String, Value>, surfaced: &[&str]) -> Map<String, Value> {
    object
        .iter()
        .filter(|(key, _)| key.as_str() != STATUS_FIELD && !surfaced.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
