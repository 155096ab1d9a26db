//! Etherscan-style proxy API, the secondary read path
//!
//! Requests are plain GETs of the form
//! `?chainid=1&module=proxy&action=eth_call&to=..&data=..&tag=latest&apikey=..`.
//! The body is returned raw so that callers decide what a usable payload is;
//! the API reports rate limits and errors inside `result` with HTTP 200.

use crate::config::ProxyConfig;
use crate::error::{ConfigError, Result, RpcError};
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// One proxy API request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyQuery {
    pub module: String,
    pub action: String,
    pub params: Vec<(String, String)>,
}

impl ProxyQuery {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn eth_call(to: Address, data: &Bytes) -> Self {
        Self::new("proxy", "eth_call")
            .param("to", format!("{:#x}", to))
            .param("data", data.to_string())
            .param("tag", "latest")
    }

    pub fn transaction_receipt(hash: B256) -> Self {
        Self::new("proxy", "eth_getTransactionReceipt").param("txhash", format!("{:#x}", hash))
    }

    pub fn block_reward(block: u64) -> Self {
        Self::new("block", "getblockreward").param("blockno", block.to_string())
    }

    pub fn block_number() -> Self {
        Self::new("proxy", "eth_blockNumber")
    }

    /// Query pairs in request order, without chain id or API key
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        [("module", self.module.as_str()), ("action", self.action.as_str())]
            .into_iter()
            .chain(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Transport for proxy API requests
#[async_trait]
pub trait ProxyApi: Send + Sync {
    /// Perform the request and return the raw response body
    async fn get(&self, query: &ProxyQuery) -> Result<String>;
}

/// Reqwest-backed proxy client for the Etherscan v2 API
#[derive(Debug, Clone)]
pub struct EtherscanProxy {
    http: reqwest::Client,
    base_url: Url,
    chain_id: u64,
    api_key: Option<String>,
    timeout: Duration,
}

impl EtherscanProxy {
    pub fn new(config: &ProxyConfig, timeout: Duration) -> Result<Self> {
        if config.require_api_key && config.api_key.is_none() {
            return Err(ConfigError::MissingApiKey.into());
        }

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::ConnectionFailed(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            chain_id: config.chain_id,
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Full request URL; the API key is always the last parameter
    pub fn url(&self, query: &ProxyQuery) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("chainid", &self.chain_id.to_string());
            for (key, value) in query.pairs() {
                pairs.append_pair(key, value);
            }
            if let Some(key) = &self.api_key {
                pairs.append_pair("apikey", key);
            }
        }
        url
    }
}

#[async_trait]
impl ProxyApi for EtherscanProxy {
    async fn get(&self, query: &ProxyQuery) -> Result<String> {
        let url = self.url(query);
        tracing::debug!("Proxy request {}.{}", query.module, query.action);

        let timeout_ms = self.timeout.as_millis() as u64;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RpcError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::from_reqwest(e, timeout_ms))?;

        if !status.is_success() {
            return Err(RpcError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, 200),
            }
            .into());
        }

        Ok(body)
    }
}

/// Extract `result` from a JSON-RPC style proxy body (`module=proxy`)
pub fn proxy_result(body: &str) -> Result<Value> {
    let mut json: Value = serde_json::from_str(body)?;

    if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(RpcError::Protocol { code, message }.into());
    }

    match json.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(RpcError::InvalidResponse(truncate(body, 200)).into()),
    }
}

/// Envelope of the non-proxy modules: `{status, message, result}`
#[derive(Debug, Deserialize)]
pub struct ProxyEnvelope<T> {
    pub status: String,
    pub message: String,
    pub result: T,
}

/// `module=block&action=getblockreward` result; numbers arrive as decimal strings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReward {
    pub block_number: String,
    pub time_stamp: String,
}

/// Parse an envelope whose `status` must be `"1"`.
///
/// A failed status carrying text or `null` in `result` (rate limits) is a
/// decode failure and stays retryable.
pub fn envelope_result<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: ProxyEnvelope<Value> = serde_json::from_str(body)?;
    if envelope.status != "1" {
        let err = if envelope.result.is_string() || envelope.result.is_null() {
            RpcError::InvalidResponse(format!("{}: {}", envelope.message, envelope.result))
        } else {
            RpcError::ProxyStatus {
                message: envelope.message,
                result: envelope.result.to_string(),
            }
        };
        return Err(err.into());
    }
    Ok(serde_json::from_value(envelope.result)?)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
