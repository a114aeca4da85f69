//! Request Normalizer
//!
//! Turns a [`RequestDescriptor`] into a [`PreparedRequest`]: resolves the URL
//! against the configured origin, injects the bearer credential and picks the
//! body encoding.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::core::transport::{PreparedBody, PreparedRequest};
use crate::error::{normalize_failure, ApiResult, RawFailure};
use crate::token::storage::{CredentialStore, ACCESS_TOKEN_KEY};
use crate::types::{AccessToken, ClientConfig, FormField, RequestBody, RequestDescriptor};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

/// Prepares requests for the transport.
pub struct RequestNormalizer<S: CredentialStore> {
    base_url: Url,
    timeout: Duration,
    default_headers: HashMap<String, String>,
    store: Arc<S>,
}

impl<S: CredentialStore> RequestNormalizer<S> {
    /// Create new normalizer.
    pub fn new(config: &ClientConfig, store: Arc<S>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: config.timeout,
            default_headers: config.default_headers.clone(),
            store,
        }
    }

    /// Prepare a request, attaching the stored access token unless the
    /// descriptor skips auth.
    ///
    /// A missing token is not an error: the request goes out unauthenticated
    /// and any authentication failure is detected from the response.
    pub async fn prepare(&self, descriptor: &RequestDescriptor) -> ApiResult<PreparedRequest> {
        let token = if descriptor.skip_auth {
            None
        } else {
            self.stored_access_token().await
        };

        self.prepare_with_token(descriptor, token.as_ref())
    }

    /// Prepare a request with an explicit token (used when replaying).
    pub fn prepare_with_token(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&AccessToken>,
    ) -> ApiResult<PreparedRequest> {
        let url = self.resolve_url(&descriptor.url, &descriptor.params)?;

        let mut headers = self.default_headers.clone();
        headers
            .entry("accept".to_string())
            .or_insert_with(|| CONTENT_TYPE_JSON.to_string());
        for (name, value) in &descriptor.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        let is_form_data =
            descriptor.is_form_data || matches!(descriptor.body, RequestBody::Form(_));

        let body = if is_form_data {
            headers.insert("content-type".to_string(), CONTENT_TYPE_MULTIPART.to_string());
            PreparedBody::Multipart(into_form_fields(&descriptor.body))
        } else {
            headers.insert("content-type".to_string(), CONTENT_TYPE_JSON.to_string());
            match &descriptor.body {
                RequestBody::Json(value) => PreparedBody::Json(value.clone()),
                _ => PreparedBody::Empty,
            }
        };

        if !descriptor.skip_auth {
            if let Some(token) = token {
                headers.insert("authorization".to_string(), token.bearer_header());
            }
        }

        Ok(PreparedRequest {
            method: descriptor.method,
            url,
            headers,
            body,
            timeout: Some(self.timeout),
        })
    }

    /// Resolve a path against the base URL and append query parameters.
    ///
    /// Absolute `http(s)` URLs are used as given.
    pub fn resolve_url(&self, path: &str, params: &[(String, String)]) -> ApiResult<String> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };

        let mut url = Url::parse(&raw).map_err(|e| {
            warn!(path = %path, error = %e, "Request URL could not be resolved");
            normalize_failure(&RawFailure::no_response(format!("invalid URL {}: {}", raw, e)))
        })?;

        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url.into())
    }

    async fn stored_access_token(&self) -> Option<AccessToken> {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()).map(AccessToken::new),
            Err(e) => {
                warn!(error = %e, "Failed to read access token; sending unauthenticated");
                None
            }
        }
    }
}

/// Convert a body into multipart fields.
///
/// A form body passes through. Each key of a JSON object becomes one text
/// field: strings verbatim, other values as compact JSON, `null` skipped.
fn into_form_fields(body: &RequestBody) -> Vec<FormField> {
    match body {
        RequestBody::Form(fields) => fields.clone(),
        RequestBody::Json(Value::Object(object)) => object
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| match value {
                Value::String(text) => FormField::text(key.clone(), text.clone()),
                other => FormField::text(key.clone(), other.to_string()),
            })
            .collect(),
        RequestBody::Json(_) | RequestBody::Empty => Vec::new(),
    }
}
