//! reqwest-backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url, header::RETRY_AFTER};
use serde_json::Value;
use tracing::debug;

use crate::cache::FetchError;
use crate::transport::{ApiMethod, ApiRequest, Transport};

use super::error::InfraError;

pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("freshstack/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, request: &ApiRequest) -> Result<Url, FetchError> {
        let mut url = self
            .base
            .join(&request.path)
            .map_err(|err| FetchError::transport(format!("invalid request path: {err}")))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: ApiRequest) -> Result<Value, FetchError> {
        let url = self.url(&request)?;
        let method = match request.method {
            ApiMethod::Get => Method::GET,
            ApiMethod::Patch => Method::PATCH,
        };
        debug!(%method, %url, "Sending API request");

        let mut builder = self.client.request(method, url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| FetchError::transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            return Err(FetchError::from_status(status.as_u16(), retry_after_secs));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::transport(err.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| FetchError::decode(err.to_string()))
    }
}
