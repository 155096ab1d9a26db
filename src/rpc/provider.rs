//! Live JSON-RPC provider, the primary read path

use super::types::{BlockInfo, Receipt};
use crate::error::{ConfigError, Result, RpcError};
use alloy::primitives::{Address, Bytes, B256, U64};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::borrow::Cow;

/// A node the client can query directly
#[async_trait]
pub trait LiveProvider: Send + Sync {
    /// Whether the provider is currently usable; checked before every request
    async fn is_connected(&self) -> bool;

    /// `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>>;

    /// Header fields of a block, without transactions
    async fn block(&self, number: u64) -> Result<Option<BlockInfo>>;

    async fn block_number(&self) -> Result<u64>;
}

/// [`LiveProvider`] over an alloy HTTP provider
#[derive(Clone)]
pub struct AlloyProvider {
    inner: RootProvider,
    url: String,
}

impl AlloyProvider {
    pub fn new(url: &str) -> Result<Self> {
        let parsed = url
            .parse()
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self {
            inner: RootProvider::new_http(parsed),
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn provider_error(method: &str, err: impl std::fmt::Display) -> RpcError {
    RpcError::Provider(format!("{}: {}", method, err))
}

#[async_trait]
impl LiveProvider for AlloyProvider {
    async fn is_connected(&self) -> bool {
        match self.inner.get_chain_id().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Live provider {} unreachable: {}", self.url, e);
                false
            }
        }
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default().to(to).input(data.into());
        self.inner
            .call(tx)
            .await
            .map_err(|e| provider_error("eth_call", e).into())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>> {
        self.inner
            .raw_request(Cow::Borrowed("eth_getTransactionReceipt"), (hash,))
            .await
            .map_err(|e| provider_error("eth_getTransactionReceipt", e).into())
    }

    async fn block(&self, number: u64) -> Result<Option<BlockInfo>> {
        self.inner
            .raw_request(
                Cow::Borrowed("eth_getBlockByNumber"),
                (U64::from(number), false),
            )
            .await
            .map_err(|e| provider_error("eth_getBlockByNumber", e).into())
    }

    async fn block_number(&self) -> Result<u64> {
        self.inner
            .get_block_number()
            .await
            .map_err(|e| provider_error("eth_blockNumber", e).into())
    }
}
