//! Adaptive multi-range log collection
//!
//! Drives a [`LogRangeFetcher`] over a large block range: the range is
//! pre-chunked by `max_block_range`, fetched in waves of `concurrency`
//! requests, re-split on [`RangeOutcome::SplitRequired`] and retried on
//! [`RangeOutcome::Retryable`] up to a fixed budget.

use crate::fetcher::{BlockRange, LogQuery, LogRangeFetcher, RangeOutcome};
use alloy::rpc::types::Log;
use futures::future::join_all;
use std::collections::VecDeque;
use std::time::Duration;

/// How to narrow a range that returned too many results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitStrategy {
    /// Halve the range
    #[default]
    Bisect,
    /// Cut into fixed-size pieces; ranges already this small are halved
    Chunk(u64),
}

impl SplitStrategy {
    /// Sub-ranges to fetch instead of `range`; `None` if it cannot shrink
    pub fn split(&self, range: &BlockRange) -> Option<Vec<BlockRange>> {
        match *self {
            SplitStrategy::Chunk(size) if size > 0 && range.count() > size => {
                Some(range.chunks(size))
            }
            _ => range.bisect().map(|(a, b)| vec![a, b]),
        }
    }
}

/// Crawl tuning
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub concurrency: usize,
    /// Largest range sent in a single request before any splitting
    pub max_block_range: u64,
    /// Generic-error retries per range
    pub max_range_retries: u32,
    pub retry_delay: Duration,
    pub split: SplitStrategy,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_block_range: 5000,
            max_range_retries: 3,
            retry_delay: Duration::from_secs(5),
            split: SplitStrategy::Bisect,
        }
    }
}

/// A range the crawl gave up on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFailure {
    pub range: BlockRange,
    pub code: Option<i64>,
    pub message: String,
}

/// Everything a crawl collected
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Sorted by block number, then log index
    pub logs: Vec<Log>,
    pub failed: Vec<RangeFailure>,
    /// Number of `eth_getLogs` requests issued
    pub requests: u64,
}

impl CrawlReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(CrawlProgress) + Send + Sync>;

/// Crawl progress information
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    /// Blocks fetched successfully or given up on
    pub blocks_done: u64,
    pub total_blocks: u64,
    pub logs_fetched: u64,
    /// Ranges waiting for the next wave
    pub pending_ranges: usize,
}

impl CrawlProgress {
    pub fn percent(&self) -> f64 {
        if self.total_blocks == 0 {
            100.0
        } else {
            self.blocks_done as f64 / self.total_blocks as f64 * 100.0
        }
    }
}

/// Collects all logs for a range, splitting and retrying as needed
pub struct LogCrawler {
    fetcher: LogRangeFetcher,
    settings: CrawlSettings,
    progress_callback: Option<ProgressCallback>,
}

impl LogCrawler {
    pub fn new(fetcher: LogRangeFetcher, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            settings,
            progress_callback: None,
        }
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(CrawlProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub async fn crawl(&self, query: &LogQuery, range: BlockRange) -> CrawlReport {
        let mut queue: VecDeque<BlockRange> =
            range.chunks(self.settings.max_block_range).into();
        let mut report = CrawlReport::default();
        let mut blocks_done = 0u64;
        let concurrency = self.settings.concurrency.max(1);

        tracing::info!(
            "Fetching logs from block {} to {} ({} chunks)",
            range.start,
            range.end,
            queue.len()
        );

        while !queue.is_empty() {
            let wave: Vec<BlockRange> = queue.drain(..concurrency.min(queue.len())).collect();
            let first_id = report.requests + 1;
            report.requests += wave.len() as u64;

            let outcomes = join_all(
                wave.into_iter()
                    .zip(first_id..)
                    .map(|(r, id)| self.fetcher.fetch(query, r, id)),
            )
            .await;

            let mut retry_pending = false;
            for outcome in outcomes {
                match outcome {
                    RangeOutcome::Success { range, logs } => {
                        blocks_done = blocks_done.saturating_add(range.count());
                        report.logs.extend(logs);
                    }
                    RangeOutcome::SplitRequired {
                        range,
                        code,
                        message,
                    } => match self.settings.split.split(&range) {
                        Some(parts) => {
                            tracing::debug!("Splitting {} into {} ranges", range, parts.len());
                            queue.extend(parts);
                        }
                        None => {
                            blocks_done = blocks_done.saturating_add(range.count());
                            report.failed.push(RangeFailure {
                                range,
                                code: Some(code),
                                message,
                            });
                        }
                    },
                    RangeOutcome::Abort {
                        range,
                        code,
                        message,
                    } => {
                        blocks_done = blocks_done.saturating_add(range.count());
                        report.failed.push(RangeFailure {
                            range,
                            code,
                            message,
                        });
                    }
                    RangeOutcome::Retryable {
                        range,
                        code,
                        reason,
                    } => {
                        if range.retries < self.settings.max_range_retries {
                            queue.push_back(range.retried());
                            retry_pending = true;
                        } else {
                            blocks_done = blocks_done.saturating_add(range.count());
                            report.failed.push(RangeFailure {
                                range,
                                code,
                                message: reason,
                            });
                        }
                    }
                }
            }

            if let Some(cb) = &self.progress_callback {
                cb(CrawlProgress {
                    blocks_done,
                    total_blocks: range.count(),
                    logs_fetched: report.logs.len() as u64,
                    pending_ranges: queue.len(),
                });
            }

            if retry_pending {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        // Sort by block number and log index
        report
            .logs
            .sort_by(|a, b| (a.block_number, a.log_index).cmp(&(b.block_number, b.log_index)));

        tracing::info!(
            "Fetched {} logs in {} requests ({} ranges failed)",
            report.logs.len(),
            report.requests,
            report.failed.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::fetcher::tests::log_json;
    use crate::rpc::JsonRpcTransport;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Endpoint that rejects ranges wider than `limit` blocks and returns one
    /// log per block otherwise
    struct CappedNode {
        limit: u64,
        failures_before_success: AtomicUsize,
        requests: AtomicUsize,
    }

    impl CappedNode {
        fn new(limit: u64) -> Arc<Self> {
            Arc::new(Self {
                limit,
                failures_before_success: AtomicUsize::new(0),
                requests: AtomicUsize::new(0),
            })
        }
    }

    fn block_param(body: &Value, key: &str) -> u64 {
        let hex = body["params"][0][key].as_str().unwrap();
        u64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap()
    }

    #[async_trait]
    impl JsonRpcTransport for CappedNode {
        async fn post(&self, body: &Value) -> Result<Value, RpcError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_before_success
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(RpcError::Timeout(55_000));
            }

            let from = block_param(body, "fromBlock");
            let to = block_param(body, "toBlock");
            if to - from + 1 > self.limit {
                return Ok(json!({
                    "jsonrpc": "2.0",
                    "id": body["id"],
                    "error": {"code": -32005, "message": "query returned more than 1000 results"}
                }));
            }
            let logs: Vec<Value> = (from..=to).rev().map(|b| log_json(b, 0)).collect();
            Ok(json!({"jsonrpc": "2.0", "id": body["id"], "result": logs}))
        }
    }

    fn settings() -> CrawlSettings {
        CrawlSettings {
            concurrency: 2,
            max_block_range: 100,
            max_range_retries: 2,
            retry_delay: Duration::from_secs(5),
            split: SplitStrategy::Bisect,
        }
    }

    fn query() -> LogQuery {
        LogQuery::default()
    }

    #[test]
    fn test_split_strategies() {
        let range = BlockRange::new(0, 9).unwrap();
        assert_eq!(SplitStrategy::Bisect.split(&range).unwrap().len(), 2);
        assert_eq!(SplitStrategy::Chunk(3).split(&range).unwrap().len(), 4);
        // too small to chunk, halve instead
        assert_eq!(SplitStrategy::Chunk(20).split(&range).unwrap().len(), 2);
        assert!(SplitStrategy::Bisect
            .split(&BlockRange::new(4, 4).unwrap())
            .is_none());
    }

    #[tokio::test]
    async fn test_crawl_bisects_until_it_fits() {
        let node = CappedNode::new(4);
        let crawler = LogCrawler::new(LogRangeFetcher::new(node.clone()), settings());

        let report = crawler
            .crawl(&query(), BlockRange::new(0, 15).unwrap())
            .await;
        assert!(report.is_complete());
        assert_eq!(report.logs.len(), 16);
        // 0-15 -> 0-7, 8-15 -> four ranges of 4
        assert_eq!(report.requests, 7);

        let blocks: Vec<u64> = report.logs.iter().filter_map(|l| l.block_number).collect();
        assert_eq!(blocks, (0..16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_single_block_split_fails() {
        let node = CappedNode::new(0);
        let crawler = LogCrawler::new(LogRangeFetcher::new(node), settings());

        let report = crawler.crawl(&query(), BlockRange::new(7, 8).unwrap()).await;
        assert!(report.logs.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().all(|f| f.code == Some(-32005)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget() {
        let node = CappedNode::new(100);
        node.failures_before_success.store(2, Ordering::SeqCst);
        let crawler = LogCrawler::new(LogRangeFetcher::new(node.clone()), settings());

        let report = crawler.crawl(&query(), BlockRange::new(0, 9).unwrap()).await;
        assert!(report.is_complete());
        assert_eq!(report.logs.len(), 10);
        assert_eq!(node.requests.load(Ordering::SeqCst), 3);

        let node = CappedNode::new(100);
        node.failures_before_success.store(10, Ordering::SeqCst);
        let crawler = LogCrawler::new(LogRangeFetcher::new(node.clone()), settings());

        let report = crawler.crawl(&query(), BlockRange::new(0, 9).unwrap()).await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].range.retries, 2);
        assert_eq!(node.requests.load(Ordering::SeqCst), 3);
    }

    /// Endpoint that fails every request with a fatal JSON-RPC error
    struct RejectingNode;

    #[async_trait]
    impl JsonRpcTransport for RejectingNode {
        async fn post(&self, body: &Value) -> Result<Value, RpcError> {
            Ok(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": {"code": -32700, "message": "parse error"}
            }))
        }
    }

    #[tokio::test]
    async fn test_full_width_range_progress_saturates() {
        let settings = CrawlSettings {
            max_block_range: u64::MAX,
            ..settings()
        };
        let totals = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = totals.clone();
        let crawler = LogCrawler::new(LogRangeFetcher::new(Arc::new(RejectingNode)), settings)
            .with_progress(move |p| {
                seen.lock().unwrap().push((p.blocks_done, p.total_blocks));
            });

        let report = crawler
            .crawl(&query(), BlockRange::new(0, u64::MAX).unwrap())
            .await;
        // one chunk of u64::MAX blocks plus the final block, in a single wave
        assert_eq!(report.requests, 2);
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().all(|f| f.code == Some(-32700)));
        assert_eq!(*totals.lock().unwrap(), vec![(u64::MAX, u64::MAX)]);
    }

    #[tokio::test]
    async fn test_prechunked_by_max_range() {
        let node = CappedNode::new(1000);
        let progress = Arc::new(AtomicUsize::new(0));
        let seen = progress.clone();
        let crawler = LogCrawler::new(LogRangeFetcher::new(node), settings())
            .with_progress(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let report = crawler.crawl(&query(), BlockRange::new(0, 249).unwrap()).await;
        assert_eq!(report.requests, 3);
        assert_eq!(report.logs.len(), 250);
        // waves of two
        assert_eq!(progress.load(Ordering::SeqCst), 2);
    }
}
