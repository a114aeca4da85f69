//! Refresh Exchange
//!
//! The network call trading a refresh token for a new access token.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::normalizer::CONTENT_TYPE_JSON;
use crate::core::transport::{HttpTransport, PreparedBody, PreparedRequest};
use crate::error::{ApiError, ApiResult, GENERIC_ERROR_MESSAGE};
use crate::types::{HttpMethod, TokenGrant};

/// Refresh exchange interface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshExchange: Send + Sync {
    /// Exchange a refresh token for a new access token.
    async fn exchange(&self, refresh_token: &str) -> ApiResult<TokenGrant>;
}

/// Refresh exchange performed over HTTP through the client's transport.
///
/// Sends `{"refreshToken": "<token>"}` as JSON without credentials.
pub struct HttpRefreshExchange<T: HttpTransport> {
    transport: Arc<T>,
    url: String,
    timeout: Duration,
}

impl<T: HttpTransport> HttpRefreshExchange<T> {
    /// Create new exchange targeting an absolute URL.
    pub fn new(transport: Arc<T>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            url: url.into(),
            timeout,
        }
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, refresh_token: &str) -> PreparedRequest {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), CONTENT_TYPE_JSON.to_string());
        headers.insert("accept".to_string(), CONTENT_TYPE_JSON.to_string());

        PreparedRequest {
            method: HttpMethod::Post,
            url: self.url.clone(),
            headers,
            body: PreparedBody::Json(json!({ "refreshToken": refresh_token })),
            timeout: Some(self.timeout),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> RefreshExchange for HttpRefreshExchange<T> {
    async fn exchange(&self, refresh_token: &str) -> ApiResult<TokenGrant> {
        debug!(url = %self.url, "Requesting token refresh");

        let response = self.transport.send(self.build_request(refresh_token)).await?;

        TokenGrant::from_payload(&response.data).ok_or_else(|| {
            ApiError::new(GENERIC_ERROR_MESSAGE, response.status)
                .with_field("reason", "Refresh response did not contain an access token")
        })
    }
}
