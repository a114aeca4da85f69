//! Request Types
//!
//! Caller-side request descriptors.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a multipart form field.
#[derive(Clone, Debug, PartialEq)]
pub enum FormValue {
    /// Text field.
    Text(String),
    /// File upload.
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// A single multipart form field.
#[derive(Clone, Debug, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

impl FormField {
    /// Text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// File field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                content_type,
                bytes,
            },
        }
    }
}

/// Request body as supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Structured body. Sent as JSON, or split into form fields when the
    /// request is marked as form data.
    Json(Value),
    /// Body that is already in multipart form.
    Form(Vec<FormField>),
}

/// Description of a single API call.
///
/// `retried` is set by the client once the call has been through a
/// refresh-and-retry cycle; a descriptor with `retried` set never triggers
/// another refresh.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    /// Path relative to the configured base URL, or an absolute URL.
    pub url: String,
    pub method: HttpMethod,
    /// Query parameters.
    pub params: Vec<(String, String)>,
    pub body: RequestBody,
    pub headers: HashMap<String, String>,
    /// Send without credentials and bypass the refresh flow.
    pub skip_auth: bool,
    /// Encode the body as multipart form data.
    pub is_form_data: bool,
    pub retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            params: Vec::new(),
            body: RequestBody::Empty,
            headers: HashMap::new(),
            skip_auth: false,
            is_form_data: false,
            retried: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add a header. Names are stored lowercase.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set a structured body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Set a body that is already multipart, marking the request as form data.
    pub fn form(mut self, fields: Vec<FormField>) -> Self {
        self.body = RequestBody::Form(fields);
        self.is_form_data = true;
        self
    }

    /// Encode the body as multipart form data.
    pub fn form_data(mut self) -> Self {
        self.is_form_data = true;
        self
    }

    /// Send without credentials (login, signup, refresh and similar).
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// Whether a 401 on this request may start or join a refresh cycle.
    pub fn is_refresh_eligible(&self) -> bool {
        !self.skip_auth && !self.retried
    }
}
