//! Network access behind an injected strategy.
//!
//! Callers never branch on the host environment: whatever can reach the API
//! implements [`Transport`] and is handed to [`ApiClient`] at construction.

mod client;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::FetchError;
pub use client::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Patch,
}

/// A request relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: ApiMethod::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Performs one request and yields the decoded JSON body.
///
/// Non-success statuses map to [`FetchError::Status`], except 429 which maps
/// to [`FetchError::RateLimited`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch(&self, request: ApiRequest) -> Result<Value, FetchError>;
}

#[async_trait]
impl<T: Transport> Transport for std::sync::Arc<T> {
    async fn fetch(&self, request: ApiRequest) -> Result<Value, FetchError> {
        (**self).fetch(request).await
    }
}

/// Unwrap the `{"success", "data", "error"}` envelope used by the dashboard
/// API. Bodies without a `data` or `error` field are returned whole.
pub fn decode_data_envelope(body: Value) -> Result<Value, FetchError> {
    let Value::Object(mut fields) = body else {
        return Ok(body);
    };

    match fields.remove("data") {
        Some(data) if !data.is_null() => return Ok(data),
        Some(data) => {
            fields.insert("data".to_string(), data);
        }
        None => {}
    }

    match fields.get("error") {
        Some(Value::String(message)) if !message.is_empty() => {
            Err(FetchError::upstream(message.clone()))
        }
        Some(other) if !other.is_null() && other != &Value::Bool(false) => {
            Err(FetchError::upstream(other.to_string()))
        }
        _ => Ok(Value::Object(fields)),
    }
}
