//! Dual-path read client
//!
//! Every operation tries the live provider first, but only when one is
//! configured and reports itself connected. Any failure there falls back to
//! the proxy API. Proxy responses that cannot be decoded (rate-limit text,
//! truncated bodies, unexpected `result` shapes) are retried after a fixed
//! delay while the [`RetryState`] budget lasts; proxy transport failures
//! surface immediately.

use super::call::ContractCall;
use super::provider::{AlloyProvider, LiveProvider};
use super::proxy::{envelope_result, proxy_result, BlockReward, EtherscanProxy, ProxyApi, ProxyQuery};
use super::retry::{RetryState, PROXY_RETRY_DELAY};
use super::types::{BlockTime, Receipt};
use crate::config::Config;
use crate::error::{Result, RpcError};
use crate::numeric::hex_to_u64;
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Bytes, B256};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default number of concurrent requests in batch operations
pub const DEFAULT_CONCURRENCY: usize = 5;

/// A batch result tagged with the position of its input
#[derive(Debug)]
pub struct Indexed<T> {
    pub index: usize,
    pub result: Result<T>,
}

impl<T> Indexed<T> {
    /// Restore input order
    pub fn sort(results: &mut [Indexed<T>]) {
        results.sort_by_key(|r| r.index);
    }
}

/// Read client with live-then-proxy fallback
#[derive(Clone)]
pub struct RpcClient {
    live: Option<Arc<dyn LiveProvider>>,
    proxy: Arc<dyn ProxyApi>,
    retry_delay: Duration,
    concurrency: usize,
}

impl RpcClient {
    /// Proxy-only client
    pub fn new(proxy: Arc<dyn ProxyApi>) -> Self {
        Self {
            live: None,
            proxy,
            retry_delay: PROXY_RETRY_DELAY,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_live_provider(mut self, live: Arc<dyn LiveProvider>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build the live provider (if configured) and the Etherscan proxy
    pub fn from_config(config: &Config) -> Result<Self> {
        let proxy = EtherscanProxy::new(&config.proxy, config.rpc.timeout())?;
        let mut client = Self::new(Arc::new(proxy))
            .with_retry_delay(config.rpc.retry_delay())
            .with_concurrency(config.rpc.concurrency);

        if let Some(url) = &config.rpc.live_endpoint {
            client = client.with_live_provider(Arc::new(AlloyProvider::new(url)?));
        }
        Ok(client)
    }

    pub fn has_live_provider(&self) -> bool {
        self.live.is_some()
    }

    /// The live provider, if present and connected
    async fn connected_live(&self) -> Option<&Arc<dyn LiveProvider>> {
        let live = self.live.as_ref()?;
        if live.is_connected().await {
            Some(live)
        } else {
            tracing::debug!("Live provider not connected, using proxy");
            None
        }
    }

    /// Execute a read-only contract call and decode its output
    pub async fn call(&self, call: &ContractCall) -> Result<Vec<DynSolValue>> {
        // NoAbi and encode failures would fail identically on both paths
        let calldata = call.calldata()?;

        let state = match self.connected_live().await {
            Some(live) => match live.call(call.address, calldata.clone()).await {
                Ok(output) => match call.decode_output(&output) {
                    Ok(values) => return Ok(values),
                    Err(e) => {
                        tracing::warn!("{} output from live provider: {}", call.function_name(), e);
                        RetryState::none(self.retry_delay)
                    }
                },
                Err(e) => {
                    tracing::warn!("{} via live provider failed: {}", call.function_name(), e);
                    RetryState::new(1, self.retry_delay)
                }
            },
            None => RetryState::none(self.retry_delay),
        };

        let query = ProxyQuery::eth_call(call.address, &calldata);
        self.with_proxy_retry(state, call.function_name(), || self.proxy_call(call, &query))
            .await
    }

    /// Fetch a receipt; `None` if the transaction is unknown
    ///
    /// The live result is used only once the transaction is mined. The proxy
    /// result is returned as-is, so callers should check
    /// [`Receipt::is_confirmed`].
    pub async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>> {
        if let Some(live) = self.connected_live().await {
            match live.transaction_receipt(hash).await {
                Ok(Some(receipt)) if receipt.is_confirmed() => return Ok(Some(receipt)),
                Ok(_) => tracing::debug!("No mined receipt for {} from live provider", hash),
                Err(e) => tracing::warn!("Receipt {} via live provider failed: {}", hash, e),
            }
        }

        let query = ProxyQuery::transaction_receipt(hash);
        self.with_proxy_retry(RetryState::none(self.retry_delay), "receipt", || {
            self.proxy_receipt(&query)
        })
        .await
    }

    /// Timestamp of a block
    pub async fn block_time(&self, number: u64) -> Result<BlockTime> {
        if let Some(live) = self.connected_live().await {
            match live.block(number).await {
                Ok(Some(block)) => {
                    return Ok(BlockTime {
                        block_number: number,
                        timestamp: block.timestamp(),
                    })
                }
                Ok(None) => tracing::debug!("Block {} unknown to live provider", number),
                Err(e) => tracing::warn!("Block {} via live provider failed: {}", number, e),
            }
        }

        let query = ProxyQuery::block_reward(number);
        self.with_proxy_retry(RetryState::none(self.retry_delay), "block time", || {
            self.proxy_block_time(&query)
        })
        .await
    }

    /// Current chain height
    pub async fn block_number(&self) -> Result<u64> {
        if let Some(live) = self.connected_live().await {
            match live.block_number().await {
                Ok(number) => return Ok(number),
                Err(e) => tracing::warn!("Block number via live provider failed: {}", e),
            }
        }

        let query = ProxyQuery::block_number();
        self.with_proxy_retry(RetryState::none(self.retry_delay), "block number", || {
            self.proxy_block_number(&query)
        })
        .await
    }

    /// Fetch many receipts concurrently; results arrive in completion order
    pub async fn transaction_receipts(&self, hashes: &[B256]) -> Vec<Indexed<Option<Receipt>>> {
        stream::iter(hashes.iter().copied().enumerate())
            .map(|(index, hash)| async move {
                Indexed {
                    index,
                    result: self.transaction_receipt(hash).await,
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Fetch many block timestamps concurrently; results arrive in completion order
    pub async fn block_times(&self, numbers: &[u64]) -> Vec<Indexed<BlockTime>> {
        stream::iter(numbers.iter().copied().enumerate())
            .map(|(index, number)| async move {
                Indexed {
                    index,
                    result: self.block_time(number).await,
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn proxy_call(&self, call: &ContractCall, query: &ProxyQuery) -> Result<Vec<DynSolValue>> {
        let body = self.proxy.get(query).await?;
        let output = hex_result(proxy_result(&body)?)?;
        call.decode_output(&output)
    }

    async fn proxy_receipt(&self, query: &ProxyQuery) -> Result<Option<Receipt>> {
        let body = self.proxy.get(query).await?;
        match proxy_result(&body)? {
            Value::Null => Ok(None),
            value => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    async fn proxy_block_time(&self, query: &ProxyQuery) -> Result<BlockTime> {
        let body = self.proxy.get(query).await?;
        let reward: BlockReward = envelope_result(&body)?;
        Ok(BlockTime {
            block_number: parse_decimal(&reward.block_number)?,
            timestamp: parse_decimal(&reward.time_stamp)?,
        })
    }

    async fn proxy_block_number(&self, query: &ProxyQuery) -> Result<u64> {
        let body = self.proxy.get(query).await?;
        match proxy_result(&body)? {
            Value::String(hex) => hex_to_u64(&hex).map_err(|e| {
                RpcError::InvalidResponse(format!("block number {}: {}", hex, e)).into()
            }),
            other => Err(RpcError::InvalidResponse(format!("block number {}", other)).into()),
        }
    }

    /// Run a proxy operation, retrying decode failures while the budget lasts
    async fn with_proxy_retry<T, F, Fut>(&self, mut state: RetryState, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_decode() => match state.next_delay() {
                    Some(delay) => {
                        tracing::warn!(
                            "Proxy {} response unusable ({}), retrying in {:?}",
                            what,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}

fn hex_result(value: Value) -> Result<Bytes> {
    match value {
        Value::String(s) => s
            .parse::<Bytes>()
            .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", s, e)).into()),
        other => Err(RpcError::InvalidResponse(format!("expected hex string, got {}", other)).into()),
    }
}

fn parse_decimal(s: &str) -> Result<u64> {
    s.parse()
        .map_err(|e| RpcError::InvalidResponse(format!("{}: {}", s, e)).into())
}
