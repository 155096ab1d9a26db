//! Single-range `eth_getLogs` fetcher
//!
//! Public endpoints cap the size of a log query's result set. Rather than
//! failing outright, [`LogRangeFetcher::fetch`] classifies each response into
//! a [`RangeOutcome`] so the caller can narrow the window and try again. The
//! fetcher itself never re-splits or retries; see
//! [`LogCrawler`](crate::crawler::LogCrawler) for a caller that does.

use crate::error::{InputError, RpcError};
use crate::numeric::block_to_hex;
use crate::rpc::{HttpTransport, JsonRpcTransport, DEFAULT_TIMEOUT};
use alloy::primitives::{Address, B256};
use alloy::rpc::types::Log;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// JSON-RPC error code for "query returned more than N results"
pub const SPLIT_REQUIRED_CODE: i64 = -32005;
/// Error codes below this are standard JSON-RPC failures and are fatal
pub const ABORT_CODE_FLOOR: i64 = -32600;

/// Inclusive block range with its generic-retry count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
    pub retries: u32,
}

impl BlockRange {
    pub fn new(start: u64, end: u64) -> Result<Self, InputError> {
        if start > end {
            return Err(InputError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            retries: 0,
        })
    }

    /// Number of blocks covered, saturating at `u64::MAX` for the full range
    pub fn count(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn is_single_block(&self) -> bool {
        self.start == self.end
    }

    /// Split into two halves; `None` for a single block
    pub fn bisect(&self) -> Option<(BlockRange, BlockRange)> {
        if self.is_single_block() {
            return None;
        }
        let mid = self.start + (self.end - self.start) / 2;
        Some((
            BlockRange {
                start: self.start,
                end: mid,
                retries: 0,
            },
            BlockRange {
                start: mid + 1,
                end: self.end,
                retries: 0,
            },
        ))
    }

    /// Consecutive pieces of at most `size` blocks
    pub fn chunks(&self, size: u64) -> Vec<BlockRange> {
        let size = size.max(1);
        let mut chunks = Vec::new();
        let mut current = self.start;

        while current <= self.end {
            let chunk_end = current.saturating_add(size - 1).min(self.end);
            chunks.push(BlockRange {
                start: current,
                end: chunk_end,
                retries: 0,
            });
            if chunk_end == u64::MAX {
                break;
            }
            current = chunk_end + 1;
        }

        chunks
    }

    /// The same range with one more retry recorded
    pub fn retried(&self) -> Self {
        Self {
            retries: self.retries + 1,
            ..*self
        }
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One topic position: a single hash or any of several
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Topic {
    Exact(B256),
    OneOf(Vec<B256>),
}

impl From<B256> for Topic {
    fn from(hash: B256) -> Self {
        Topic::Exact(hash)
    }
}

impl From<Vec<B256>> for Topic {
    fn from(hashes: Vec<B256>) -> Self {
        Topic::OneOf(hashes)
    }
}

/// What to look for, independent of the block window
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogQuery {
    pub address: Option<Address>,
    /// Positional topic filters; `None` matches anything
    pub topics: Vec<Option<Topic>>,
}

impl LogQuery {
    pub fn new(address: Address) -> Self {
        Self {
            address: Some(address),
            topics: Vec::new(),
        }
    }

    /// Append the filter for the next topic position
    pub fn topic(mut self, topic: Option<Topic>) -> Self {
        self.topics.push(topic);
        self
    }

    pub fn filter(&self, range: &BlockRange) -> LogFilter {
        LogFilter {
            from_block: block_to_hex(range.start),
            to_block: block_to_hex(range.end),
            address: self.address,
            topics: self.topics.clone(),
        }
    }
}

/// `eth_getLogs` parameter object for one range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub from_block: String,
    pub to_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub topics: Vec<Option<Topic>>,
}

/// Classified result of one fetch attempt
#[derive(Debug, Clone)]
pub enum RangeOutcome {
    Success {
        range: BlockRange,
        logs: Vec<Log>,
    },
    /// Too many results; the caller should narrow the range
    SplitRequired {
        range: BlockRange,
        code: i64,
        message: String,
    },
    /// Do not retry automatically
    Abort {
        range: BlockRange,
        code: Option<i64>,
        message: String,
    },
    /// The same range may be retried a bounded number of times
    Retryable {
        range: BlockRange,
        code: Option<i64>,
        reason: String,
    },
}

impl RangeOutcome {
    pub fn range(&self) -> &BlockRange {
        match self {
            RangeOutcome::Success { range, .. }
            | RangeOutcome::SplitRequired { range, .. }
            | RangeOutcome::Abort { range, .. }
            | RangeOutcome::Retryable { range, .. } => range,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, RangeOutcome::Success { .. })
    }

    pub fn split_retry(&self) -> bool {
        matches!(self, RangeOutcome::SplitRequired { .. })
    }

    pub fn abort(&self) -> bool {
        matches!(self, RangeOutcome::Abort { .. })
    }

    /// Error code reported by the endpoint, if any
    pub fn code(&self) -> Option<i64> {
        match self {
            RangeOutcome::Success { .. } => None,
            RangeOutcome::SplitRequired { code, .. } => Some(*code),
            RangeOutcome::Abort { code, .. } | RangeOutcome::Retryable { code, .. } => *code,
        }
    }
}

/// Classify a transport result for `range`
pub fn classify(range: BlockRange, response: Result<Value, RpcError>) -> RangeOutcome {
    let mut envelope = match response {
        Ok(envelope) => envelope,
        Err(e) => return classify_transport(range, e),
    };

    if envelope.get("jsonrpc").is_none() {
        return RangeOutcome::Retryable {
            range,
            code: None,
            reason: "response without jsonrpc marker".to_string(),
        };
    }

    if let Some(result) = envelope.get_mut("result").filter(|r| r.is_array()) {
        return match serde_json::from_value::<Vec<Log>>(result.take()) {
            Ok(logs) => RangeOutcome::Success { range, logs },
            Err(e) => RangeOutcome::Retryable {
                range,
                code: None,
                reason: format!("malformed log entries: {}", e),
            },
        };
    }

    let error = envelope.get("error");
    let code = error.and_then(|e| e.get("code")).and_then(Value::as_i64);
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match code {
        Some(SPLIT_REQUIRED_CODE) => RangeOutcome::SplitRequired {
            range,
            code: SPLIT_REQUIRED_CODE,
            message,
        },
        Some(code) if code < ABORT_CODE_FLOOR => RangeOutcome::Abort {
            range,
            code: Some(code),
            message,
        },
        // zero is not a usable code
        Some(code) if code != 0 => RangeOutcome::Retryable {
            range,
            code: Some(code),
            reason: message,
        },
        _ => RangeOutcome::Retryable {
            range,
            code: None,
            reason: if error.is_some() {
                format!("error without code: {}", message)
            } else {
                "result is not a list".to_string()
            },
        },
    }
}

fn classify_transport(range: BlockRange, err: RpcError) -> RangeOutcome {
    let retryable = match &err {
        RpcError::Timeout(_) | RpcError::ConnectionFailed(_) => true,
        RpcError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
        RpcError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    };

    if retryable {
        RangeOutcome::Retryable {
            range,
            code: None,
            reason: err.to_string(),
        }
    } else {
        RangeOutcome::Abort {
            range,
            code: None,
            message: err.to_string(),
        }
    }
}

/// Fetches logs for one range from a JSON-RPC endpoint
#[derive(Clone)]
pub struct LogRangeFetcher {
    transport: Arc<dyn JsonRpcTransport>,
}

impl LogRangeFetcher {
    pub fn new(transport: Arc<dyn JsonRpcTransport>) -> Self {
        Self { transport }
    }

    /// Fetcher over HTTP with the given timeout (default 55s)
    pub fn from_url(url: &str, timeout: Option<Duration>) -> Result<Self, RpcError> {
        let transport = HttpTransport::new(url, timeout.unwrap_or(DEFAULT_TIMEOUT))?;
        Ok(Self::new(Arc::new(transport)))
    }

    pub fn request_body(query: &LogQuery, range: &BlockRange, rpc_id: u64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": "eth_getLogs",
            "params": [query.filter(range)],
            "id": rpc_id,
        })
    }

    /// One `eth_getLogs` request for `range`, classified
    pub async fn fetch(&self, query: &LogQuery, range: BlockRange, rpc_id: u64) -> RangeOutcome {
        let body = Self::request_body(query, &range, rpc_id);
        tracing::debug!("eth_getLogs {} (id {})", range, rpc_id);

        let outcome = classify(range, self.transport.post(&body).await);
        match &outcome {
            RangeOutcome::Success { logs, .. } => {
                tracing::debug!("Range {}: {} logs", range, logs.len())
            }
            RangeOutcome::SplitRequired { message, .. } => {
                tracing::debug!("Range {} needs splitting: {}", range, message)
            }
            RangeOutcome::Abort { code, message, .. } => {
                tracing::warn!("Range {} aborted (code {:?}): {}", range, code, message)
            }
            RangeOutcome::Retryable { reason, .. } => {
                tracing::warn!("Range {} failed: {}", range, reason)
            }
        }
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::{address, b256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const EXCHANGE: Address = address!("8d12a197cb00d4747a1fe03395095ce2a5cc6819");
    const TRADE_TOPIC: B256 =
        b256!("6effdda786735d5033bfad5f53e5131abcced9e52be6c507b62d639685fbed6d");

    fn range(start: u64, end: u64) -> BlockRange {
        BlockRange::new(start, end).unwrap()
    }

    /// Log JSON as returned by a node
    pub(crate) fn log_json(block: u64, index: u64) -> Value {
        json!({
            "address": "0x8d12a197cb00d4747a1fe03395095ce2a5cc6819",
            "topics": ["0x6effdda786735d5033bfad5f53e5131abcced9e52be6c507b62d639685fbed6d"],
            "data": "0x",
            "blockNumber": format!("{:#x}", block),
            "blockHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "transactionIndex": "0x0",
            "logIndex": format!("{:#x}", index),
            "removed": false
        })
    }

    struct Canned {
        response: Mutex<Option<Result<Value, RpcError>>>,
        requests: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl JsonRpcTransport for Canned {
        async fn post(&self, body: &Value) -> Result<Value, RpcError> {
            self.requests.lock().unwrap().push(body.clone());
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(RpcError::ConnectionFailed("exhausted".into())))
        }
    }

    #[test]
    fn test_range_invariants() {
        let r = range(10, 19);
        assert_eq!(r.count(), 10);
        assert_eq!(range(7, 7).count(), 1);
        assert_eq!(range(0, u64::MAX).count(), u64::MAX);
        assert_eq!(range(1, u64::MAX).count(), u64::MAX);
        assert!(matches!(
            BlockRange::new(20, 10),
            Err(InputError::InvalidRange { start: 20, end: 10 })
        ));
    }

    #[test]
    fn test_bisect() {
        let (a, b) = range(10, 19).bisect().unwrap();
        assert_eq!((a.start, a.end, b.start, b.end), (10, 14, 15, 19));
        assert_eq!(a.count() + b.count(), 10);

        let (a, b) = range(10, 11).bisect().unwrap();
        assert_eq!((a.start, a.end, b.start, b.end), (10, 10, 11, 11));
        assert!(range(5, 5).bisect().is_none());
    }

    #[test]
    fn test_chunks() {
        let chunks = range(0, 9).chunks(4);
        let bounds: Vec<_> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(bounds, vec![(0, 3), (4, 7), (8, 9)]);
        assert_eq!(range(0, 2).chunks(100).len(), 1);
    }

    #[test]
    fn test_filter_shape() {
        let query = LogQuery::new(EXCHANGE)
            .topic(Some(TRADE_TOPIC.into()))
            .topic(None)
            .topic(Some(vec![TRADE_TOPIC, B256::ZERO].into()));
        let body = LogRangeFetcher::request_body(&query, &range(3_154_197, 3_154_300), 7);

        assert_eq!(body["method"], "eth_getLogs");
        assert_eq!(body["id"], 7);
        let filter = &body["params"][0];
        assert_eq!(filter["fromBlock"], "0x302115");
        assert_eq!(filter["toBlock"], "0x30217c");
        assert_eq!(filter["address"], "0x8d12a197cb00d4747a1fe03395095ce2a5cc6819");
        assert_eq!(filter["topics"][0], json!(TRADE_TOPIC));
        assert!(filter["topics"][1].is_null());
        assert_eq!(filter["topics"][2].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_split_required() {
        let outcome = classify(
            range(1, 100),
            Ok(json!({"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"query returned more than 1000 results"}})),
        );
        assert!(outcome.split_retry());
        assert!(outcome.is_error());
        assert!(!outcome.abort());
        assert_eq!(outcome.code(), Some(-32005));
    }

    #[test]
    fn test_method_not_found_aborts() {
        let outcome = classify(
            range(1, 100),
            Ok(json!({"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}})),
        );
        assert!(outcome.abort());
        assert!(outcome.is_error());
        assert!(!outcome.split_retry());
    }

    #[test]
    fn test_empty_result_is_success() {
        let outcome = classify(range(1, 100), Ok(json!({"jsonrpc":"2.0","id":1,"result":[]})));
        assert!(!outcome.is_error());
        match outcome {
            RangeOutcome::Success { logs, range } => {
                assert!(logs.is_empty());
                assert_eq!(range.count(), 100);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_responses_are_retryable() {
        for response in [
            json!({"id":1,"result":[]}),
            json!({"jsonrpc":"2.0","id":1,"result":"0x"}),
            json!({"jsonrpc":"2.0","id":1,"error":{"message":"busy"}}),
            json!({"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"header not found"}}),
        ] {
            let outcome = classify(range(1, 2), Ok(response));
            assert!(matches!(outcome, RangeOutcome::Retryable { .. }), "{:?}", outcome);
            assert!(outcome.is_error() && !outcome.abort() && !outcome.split_retry());
        }
    }

    #[test]
    fn test_transport_failures() {
        let outcome = classify(range(1, 2), Err(RpcError::Timeout(55_000)));
        assert!(matches!(outcome, RangeOutcome::Retryable { code: None, .. }));

        let outcome = classify(
            range(1, 2),
            Err(RpcError::HttpStatus {
                status: 503,
                body: String::new(),
            }),
        );
        assert!(matches!(outcome, RangeOutcome::Retryable { .. }));

        let outcome = classify(range(1, 2), Err(RpcError::InvalidResponse("<html>".into())));
        assert!(matches!(outcome, RangeOutcome::Abort { code: None, .. }));
    }

    #[tokio::test]
    async fn test_fetch_parses_logs() {
        let transport = Arc::new(Canned {
            response: Mutex::new(Some(Ok(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "result": [log_json(100, 0), log_json(100, 1)]
            })))),
            requests: Mutex::new(Vec::new()),
        });
        let fetcher = LogRangeFetcher::new(transport.clone());

        let outcome = fetcher.fetch(&LogQuery::new(EXCHANGE), range(100, 100), 3).await;
        match outcome {
            RangeOutcome::Success { logs, .. } => {
                assert_eq!(logs.len(), 2);
                assert_eq!(logs[1].log_index, Some(1));
                assert_eq!(logs[0].block_number, Some(100));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(transport.requests.lock().unwrap()[0]["id"], 3);
    }
}
