//! Response Types

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{ApiError, ApiResult, GENERIC_ERROR_MESSAGE};

/// Successful (2xx–3xx) response.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body. Non-JSON bodies are kept as a string, empty bodies are `Null`.
    pub data: Value,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
}

impl ApiResponse {
    /// Create a response without headers.
    pub fn new(status: u16, data: Value) -> Self {
        Self {
            status,
            data,
            headers: HashMap::new(),
        }
    }

    /// Build a response from a raw body.
    pub fn from_body(status: u16, headers: HashMap<String, String>, body: &str) -> Self {
        let data = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
        };

        Self {
            status,
            data,
            headers,
        }
    }

    /// Deserialize the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            ApiError::new(GENERIC_ERROR_MESSAGE, self.status)
                .with_field("reason", format!("Invalid response body: {}", e))
        })
    }
}
