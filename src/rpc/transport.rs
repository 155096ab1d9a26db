//! Raw JSON-RPC POST transport used by the log fetcher

use crate::error::RpcError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Default request timeout for log queries
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(55);

/// Sends one JSON-RPC request body and returns the parsed response
#[async_trait]
pub trait JsonRpcTransport: Send + Sync {
    async fn post(&self, body: &Value) -> std::result::Result<Value, RpcError>;
}

/// Reqwest-backed [`JsonRpcTransport`]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> std::result::Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::ConnectionFailed(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            http,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl JsonRpcTransport for HttpTransport {
    async fn post(&self, body: &Value) -> std::result::Result<Value, RpcError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "*/*")
            .json(body)
            .send()
            .await
            .map_err(|e| RpcError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RpcError::from_reqwest(e, timeout_ms))?;

        // Some nodes attach error envelopes to non-2xx responses
        match serde_json::from_str::<Value>(&text) {
            Ok(json) if status.is_success() || json.get("jsonrpc").is_some() => Ok(json),
            _ if !status.is_success() => Err(RpcError::HttpStatus {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            }),
            _ => Err(RpcError::InvalidResponse(text.chars().take(200).collect())),
        }
    }
}
