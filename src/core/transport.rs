//! HTTP Transport
//!
//! The single network boundary of the client. A transport performs no retry
//! or auth logic; it sends a prepared request and reports either a response
//! or a normalized error.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{normalize_failure, ApiError, ConfigurationError, RawFailure};
use crate::types::{ApiResponse, FormField, FormValue, HttpMethod};

/// Body of a prepared request.
#[derive(Clone, Debug, PartialEq)]
pub enum PreparedBody {
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
}

/// Fully prepared request, ready for the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL including query string.
    pub url: String,
    /// Request headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: PreparedBody,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl PreparedRequest {
    /// Header value by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Authorization header value, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.header("authorization")
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a prepared request.
    ///
    /// Resolves with the response on any 2xx–3xx status; rejects with a
    /// normalized error on network failure or any other status.
    async fn send(&self, request: PreparedRequest) -> Result<ApiResponse, ApiError>;
}

fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestHttpTransport {
    /// Create new transport with default settings.
    pub fn new() -> Result<Self, ConfigurationError> {
        Self::with_options(Duration::from_secs(30), None)
    }

    /// Create transport with custom options.
    pub fn with_options(
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigurationError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    fn build_form(fields: Vec<FormField>) -> Result<reqwest::multipart::Form, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        for field in fields {
            form = match field.value {
                FormValue::Text(text) => form.text(field.name, text),
                FormValue::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                    if let Some(mime) = content_type {
                        part = part.mime_str(&mime).map_err(|e| {
                            normalize_failure(&RawFailure::no_response(format!(
                                "invalid content type {}: {}",
                                mime, e
                            )))
                        })?;
                    }
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<ApiResponse, ApiError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        let is_multipart = matches!(request.body, PreparedBody::Multipart(_));
        for (key, value) in &request.headers {
            // reqwest writes the multipart content type itself, boundary included.
            if is_multipart && key == "content-type" {
                continue;
            }
            req_builder = req_builder.header(key, value);
        }

        req_builder = match request.body {
            PreparedBody::Empty => req_builder,
            PreparedBody::Json(body) => {
                let bytes = serde_json::to_vec(&body).map_err(|e| {
                    normalize_failure(&RawFailure::no_response(format!(
                        "failed to encode body: {}",
                        e
                    )))
                })?;
                req_builder.body(bytes)
            }
            PreparedBody::Multipart(fields) => req_builder.multipart(Self::build_form(fields)?),
        };

        req_builder = req_builder.timeout(timeout);

        debug!(method = %request.method, url = %request.url, "Sending request");

        let response = req_builder.send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("request timed out after {:?}", timeout)
            } else {
                e.to_string()
            };
            debug!(url = %request.url, reason = %reason, "Request produced no response");
            normalize_failure(&RawFailure::NoResponse { reason })
        })?;

        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }

        let body = response.text().await.map_err(|e| {
            normalize_failure(&RawFailure::no_response(format!(
                "failed to read response body: {}",
                e
            )))
        })?;

        trace!(status, bytes = body.len(), "Received response");

        if !is_success_status(status) {
            return Err(normalize_failure(&RawFailure::Response { status, body }));
        }

        Ok(ApiResponse::from_body(status, headers, &body))
    }
}

type Responder = Box<dyn Fn(&PreparedRequest) -> Result<ApiResponse, ApiError> + Send + Sync>;

/// Mock HTTP transport for testing.
///
/// Scripted outcomes are consumed in FIFO order. When the script is empty the
/// responder (if any) decides, otherwise the send fails as if offline.
#[derive(Default)]
pub struct MockHttpTransport {
    outcomes: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    request_history: Mutex<Vec<PreparedRequest>>,
    responder: Mutex<Option<Responder>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON response.
    pub fn queue_json_response(&self, status: u16, body: Value) -> &Self {
        self.outcomes
            .lock()
            .push_back(Ok(ApiResponse::new(status, body)));
        self
    }

    /// Queue a failure response, normalized as the real transport would.
    pub fn queue_error_response(&self, status: u16, body: Value) -> &Self {
        self.outcomes.lock().push_back(Err(normalize_failure(&RawFailure::response(
            status,
            body.to_string(),
        ))));
        self
    }

    /// Queue a connectivity failure.
    pub fn queue_network_failure(&self) -> &Self {
        self.outcomes
            .lock()
            .push_back(Err(normalize_failure(&RawFailure::no_response(
                "mock network failure",
            ))));
        self
    }

    /// Decide outcomes from the request once the script is exhausted.
    pub fn set_responder<F>(&self, responder: F) -> &Self
    where
        F: Fn(&PreparedRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<PreparedRequest> {
        self.request_history.lock().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<PreparedRequest> {
        self.request_history.lock().last().cloned()
    }

    /// Number of requests sent.
    pub fn request_count(&self) -> usize {
        self.request_history.lock().len()
    }

    /// Clear request history.
    pub fn clear_history(&self) {
        self.request_history.lock().clear();
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<ApiResponse, ApiError> {
        self.request_history.lock().push(request.clone());

        if let Some(outcome) = self.outcomes.lock().pop_front() {
            return outcome;
        }

        match self.responder.lock().as_ref() {
            Some(responder) => responder(&request),
            None => Err(normalize_failure(&RawFailure::no_response(
                "No mock response available",
            ))),
        }
    }
}
