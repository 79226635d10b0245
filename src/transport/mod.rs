use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::{
    protocol::{Credentials, DEFAULT_STACK_URL_TEMPLATE, DEFAULT_TIMEOUT_SECS},
    Result,
};

pub mod http;

pub use self::http::HttpTransport;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Stack base URL, `{stack_slug}` is replaced per call
    pub stack_url_template: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            stack_url_template: DEFAULT_STACK_URL_TEMPLATE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP verbs used against the data source API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    /// Create
    Post,
    /// Id lookup
    Get,
    /// Update by id
    Put,
    /// Delete by name
    Delete,
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiMethod::Post => write!(f, "POST"),
            ApiMethod::Get => write!(f, "GET"),
            ApiMethod::Put => write!(f, "PUT"),
            ApiMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single authenticated API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP verb
    pub method: ApiMethod,
    /// Fully built target URL
    pub url: Url,
    /// Credentials for the bearer header
    pub credentials: Credentials,
    /// JSON body, sent on create and update only
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request without a body
    pub fn new(method: ApiMethod, url: Url, credentials: &Credentials) -> Self {
        Self {
            method,
            url,
            credentials: credentials.clone(),
            body: None,
        }
    }

    /// Attaches a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and decoded body of an API response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON, a string for non-JSON bodies, null when empty
    pub body: Value,
}

impl ApiResponse {
    /// Status 200, the only status the API uses for success
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Status 409, a data source with the same name exists
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    /// Decodes a raw body as JSON, keeping non-JSON text as a string
    pub fn decode_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// Transport trait for talking to the platform API
///
/// Implementations perform exactly one round trip per call and never retry.
/// A response with any status is `Ok`; only failures to get a response at
/// all (connect, timeout, body read) are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the response
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).execute(request).await
    }
}
