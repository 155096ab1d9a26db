//! Runtime configuration
//!
//! [`ConfigFile`] is what lives on disk; [`Config`] is the validated runtime
//! form produced by [`ConfigBuilder`] from the file plus command-line
//! overrides.

mod file;

pub use file::{AbiFiles, ConfigFile};

use crate::crawler::{CrawlSettings, SplitStrategy};
use crate::error::{ConfigError, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default Etherscan v2 API endpoint
pub const DEFAULT_PROXY_URL: &str = "https://api.etherscan.io/v2/api";

/// Endpoint and request tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint for `eth_getLogs`
    #[serde(default)]
    pub log_endpoint: Option<String>,

    /// Node used as the primary path for single-value reads
    #[serde(default)]
    pub live_endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Concurrent requests for crawls and batches
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Largest block range per `eth_getLogs` request
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,

    /// Retries for a range that failed with a generic error
    #[serde(default = "default_max_range_retries")]
    pub max_range_retries: u32,

    /// Delay before a retry, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

fn default_timeout() -> u64 {
    55
}

fn default_concurrency() -> usize {
    5
}

fn default_max_block_range() -> u64 {
    5000
}

fn default_max_range_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            log_endpoint: None,
            live_endpoint: None,
            timeout_seconds: default_timeout(),
            concurrency: default_concurrency(),
            max_block_range: default_max_block_range(),
            max_range_retries: default_max_range_retries(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

/// Proxy API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_url")]
    pub base_url: String,

    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Taken from `etherscan_api_key` or the environment, never written here
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Refuse to start without an API key
    #[serde(default)]
    pub require_api_key: bool,
}

fn default_proxy_url() -> String {
    DEFAULT_PROXY_URL.to_string()
}

fn default_chain_id() -> u64 {
    1
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: default_proxy_url(),
            chain_id: default_chain_id(),
            api_key: None,
            require_api_key: false,
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub rpc: RpcConfig,
    pub proxy: ProxyConfig,
    /// Contract whose `Order`/`Trade` pairs are correlated
    pub exchange_contract: Option<Address>,
    /// Interface descriptors, in registration order
    pub abi_files: Vec<PathBuf>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Crawl tuning derived from the RPC settings
    pub fn crawl_settings(&self, split: SplitStrategy) -> CrawlSettings {
        CrawlSettings {
            concurrency: self.rpc.concurrency,
            max_block_range: self.rpc.max_block_range,
            max_range_retries: self.rpc.max_range_retries,
            retry_delay: self.rpc.retry_delay(),
            split,
        }
    }
}

/// Builder merging file values with overrides; later calls win
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    rpc: RpcConfig,
    proxy: ProxyConfig,
    exchange_contract: Option<String>,
    abi_files: Vec<PathBuf>,
}

impl ConfigBuilder {
    /// Start from a config file's values
    pub fn file(mut self, file: &ConfigFile) -> Self {
        self.rpc = file.rpc.clone();
        self.proxy = ProxyConfig {
            api_key: file.etherscan_api_key.clone(),
            ..file.proxy.clone()
        };
        self.exchange_contract = file.exchange_contract.clone();
        self.abi_files = file.abi.files.clone();
        self
    }

    pub fn log_endpoint(mut self, url: impl Into<String>) -> Self {
        self.rpc.log_endpoint = Some(url.into());
        self
    }

    pub fn live_endpoint(mut self, url: impl Into<String>) -> Self {
        self.rpc.live_endpoint = Some(url.into());
        self
    }

    pub fn timeout_seconds(mut self, secs: u64) -> Self {
        self.rpc.timeout_seconds = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.rpc.concurrency = n;
        self
    }

    pub fn max_block_range(mut self, blocks: u64) -> Self {
        self.rpc.max_block_range = blocks;
        self
    }

    pub fn max_range_retries(mut self, retries: u32) -> Self {
        self.rpc.max_range_retries = retries;
        self
    }

    pub fn retry_delay_seconds(mut self, secs: u64) -> Self {
        self.rpc.retry_delay_seconds = secs;
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy.base_url = url.into();
        self
    }

    pub fn chain_id(mut self, id: u64) -> Self {
        self.proxy.chain_id = id;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.proxy.api_key = Some(key.into());
        self
    }

    pub fn require_api_key(mut self, required: bool) -> Self {
        self.proxy.require_api_key = required;
        self
    }

    pub fn exchange_contract(mut self, address: impl Into<String>) -> Self {
        self.exchange_contract = Some(address.into());
        self
    }

    pub fn abi_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.abi_files.push(path.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        for url in [&self.rpc.log_endpoint, &self.rpc.live_endpoint]
            .into_iter()
            .flatten()
            .chain(std::iter::once(&self.proxy.base_url))
        {
            Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", url, e)))?;
        }

        if self.rpc.concurrency == 0 {
            return Err(ConfigError::InvalidFile("concurrency must be at least 1".into()).into());
        }
        if self.rpc.max_block_range == 0 {
            return Err(
                ConfigError::InvalidFile("max_block_range must be at least 1".into()).into(),
            );
        }

        if self.proxy.require_api_key && self.proxy.api_key.is_none() {
            return Err(ConfigError::MissingApiKey.into());
        }

        let exchange_contract = self
            .exchange_contract
            .as_deref()
            .map(|s| {
                s.parse::<Address>()
                    .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
            })
            .transpose()?;

        Ok(Config {
            rpc: self.rpc,
            proxy: self.proxy,
            exchange_contract,
            abi_files: self.abi_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.rpc.timeout(), Duration::from_secs(55));
        assert_eq!(config.rpc.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.proxy.base_url, DEFAULT_PROXY_URL);
        assert_eq!(config.proxy.chain_id, 1);
        assert!(config.exchange_contract.is_none());

        let settings = config.crawl_settings(SplitStrategy::Bisect);
        assert_eq!(settings.max_block_range, 5000);
        assert_eq!(settings.max_range_retries, 3);
    }

    #[test]
    fn test_overrides_win() {
        let file: ConfigFile = toml::from_str(
            r#"
etherscan_api_key = "file_key"
exchange_contract = "0x8d12a197cb00d4747a1fe03395095ce2a5cc6819"

[rpc]
concurrency = 2
"#,
        )
        .unwrap();

        let config = Config::builder()
            .file(&file)
            .concurrency(8)
            .api_key("cli_key")
            .build()
            .unwrap();
        assert_eq!(config.rpc.concurrency, 8);
        assert_eq!(config.proxy.api_key.as_deref(), Some("cli_key"));
        assert!(config.exchange_contract.is_some());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::builder().log_endpoint("not a url").build(),
            Err(Error::Config(ConfigError::InvalidUrl(_)))
        ));
        assert!(matches!(
            Config::builder().exchange_contract("0x1234").build(),
            Err(Error::Config(ConfigError::InvalidAddress(_)))
        ));
        assert!(matches!(
            Config::builder().require_api_key(true).build(),
            Err(Error::Config(ConfigError::MissingApiKey))
        ));
        assert!(Config::builder().concurrency(0).build().is_err());
    }
}
