//! explorer-rpc - Resilient blockchain reads for a block explorer
//!
//! Reads logs, receipts, block times and contract state while tolerating an
//! absent or flaky data source: single values come from a live node when one
//! is connected and fall back to an Etherscan-style proxy API with bounded
//! retries; logs are fetched one block range at a time and every response is
//! classified so that oversized ranges can be split by the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use explorer_rpc::{BlockRange, Config, LogCrawler, LogQuery, LogRangeFetcher, SplitStrategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::builder()
//!         .log_endpoint("https://mainnet.infura.io/v3/YOUR_KEY")
//!         .concurrency(4)
//!         .build()?;
//!
//!     let fetcher = LogRangeFetcher::from_url(
//!         config.rpc.log_endpoint.as_deref().unwrap_or_default(),
//!         Some(config.rpc.timeout()),
//!     )?;
//!     let crawler = LogCrawler::new(fetcher, config.crawl_settings(SplitStrategy::Bisect));
//!
//!     let query = LogQuery::new("0x8d12A197cB00D4747a1fe03395095ce2A5CC6819".parse()?);
//!     let report = crawler.crawl(&query, BlockRange::new(3_154_197, 3_200_000)?).await;
//!
//!     println!("Fetched {} logs", report.logs.len());
//!     Ok(())
//! }
//! ```

pub mod abi;
pub mod config;
pub mod crawler;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod links;
pub mod numeric;
pub mod rpc;

// Re-exports for convenience
pub use abi::{
    load_abi_file, load_registry, AbiRegistry, DecodedCall, DecodedEvent, DecodedValue,
    LogDecoder, NamedValue,
};
pub use config::{Config, ConfigBuilder, ConfigFile, ProxyConfig, RpcConfig};
pub use crawler::{CrawlProgress, CrawlReport, CrawlSettings, LogCrawler, RangeFailure, SplitStrategy};
pub use error::{AbiError, ConfigError, Error, ErrorKind, InputError, Result, RpcError};
pub use events::{EventCorrelator, LogProcessor};
pub use fetcher::{BlockRange, LogFilter, LogQuery, LogRangeFetcher, RangeOutcome, Topic};
pub use rpc::{
    AlloyProvider, BlockTime, ContractCall, EtherscanProxy, HttpTransport, Indexed,
    JsonRpcTransport, LiveProvider, ProxyApi, ProxyQuery, Receipt, RetryState, RpcClient,
};
