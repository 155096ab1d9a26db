//! Single-value reads with live-provider / proxy fallback
//!
//! [`RpcClient`] is the entry point. The live path is a [`LiveProvider`]
//! (normally [`AlloyProvider`]); the fallback is a [`ProxyApi`] (normally
//! [`EtherscanProxy`]). [`JsonRpcTransport`] is the raw POST transport used
//! by the log fetcher.

pub mod call;
pub mod client;
pub mod provider;
pub mod proxy;
pub mod retry;
pub mod transport;
pub mod types;

pub use call::ContractCall;
pub use client::{Indexed, RpcClient, DEFAULT_CONCURRENCY};
pub use provider::{AlloyProvider, LiveProvider};
pub use proxy::{proxy_result, EtherscanProxy, ProxyApi, ProxyQuery};
pub use retry::{RetryState, PROXY_RETRY_DELAY};
pub use transport::{HttpTransport, JsonRpcTransport, DEFAULT_TIMEOUT};
pub use types::{BlockInfo, BlockTime, Receipt};
