//! Log crawling command

use alloy::primitives::B256;
use clap::Args;
use explorer_rpc::{
    load_registry, BlockRange, Config, CrawlProgress, EventCorrelator, LogCrawler, LogDecoder,
    LogProcessor, LogQuery, LogRangeFetcher, RpcClient, SplitStrategy, Topic,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

#[derive(Args)]
pub struct LogsArgs {
    /// Contract address to fetch logs from
    #[arg(short, long)]
    pub address: Option<String>,

    /// Topic filter per position: a hash, comma-separated hashes, or "any"
    #[arg(long = "topic", action = clap::ArgAction::Append)]
    pub topics: Vec<String>,

    /// Start block number
    #[arg(short = 'f', long)]
    pub from_block: u64,

    /// End block number (or "latest")
    #[arg(short = 't', long, default_value = "latest")]
    pub to_block: String,

    /// ABI files used for decoding (added after the configured ones)
    #[arg(long, action = clap::ArgAction::Append)]
    pub abi: Vec<PathBuf>,

    /// Exchange contract whose Order/Trade events are merged
    #[arg(long)]
    pub exchange: Option<String>,

    /// Split policy for oversized ranges: "bisect" or "chunk:N"
    #[arg(long, default_value = "bisect")]
    pub split: String,

    /// Number of parallel requests
    #[arg(short = 'n', long)]
    pub concurrency: Option<usize>,

    /// Largest block range per request
    #[arg(long)]
    pub max_range: Option<u64>,

    /// Retries for ranges failing with a generic error
    #[arg(long)]
    pub retries: Option<u32>,

    /// Print raw logs without decoding
    #[arg(long)]
    pub raw: bool,
}

fn parse_split(s: &str) -> anyhow::Result<SplitStrategy> {
    match s.split_once(':') {
        None if s.eq_ignore_ascii_case("bisect") => Ok(SplitStrategy::Bisect),
        Some((kind, size)) if kind.eq_ignore_ascii_case("chunk") => {
            let size: u64 = size
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid chunk size '{}': {}", size, e))?;
            if size == 0 {
                anyhow::bail!("Chunk size must be at least 1");
            }
            Ok(SplitStrategy::Chunk(size))
        }
        _ => anyhow::bail!("Unknown split strategy '{}' (use bisect or chunk:N)", s),
    }
}

fn parse_topic(s: &str) -> anyhow::Result<Option<Topic>> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("any") || s.eq_ignore_ascii_case("null") {
        return Ok(None);
    }

    let hashes = s
        .split(',')
        .map(|h| B256::from_str(h.trim()).map_err(|e| anyhow::anyhow!("Invalid topic '{}': {}", h, e)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Some(match <[B256; 1]>::try_from(hashes) {
        Ok([hash]) => Topic::Exact(hash),
        Err(hashes) => Topic::OneOf(hashes),
    }))
}

pub async fn handle(args: &LogsArgs, config: Config, quiet: bool) -> anyhow::Result<()> {
    let endpoint = config
        .rpc
        .log_endpoint
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No log endpoint configured. Use --rpc or [rpc] log_endpoint"))?;

    let split = parse_split(&args.split)?;
    let mut settings = config.crawl_settings(split);
    if let Some(n) = args.concurrency {
        settings.concurrency = n.max(1);
    }
    if let Some(max) = args.max_range {
        settings.max_block_range = max.max(1);
    }
    if let Some(retries) = args.retries {
        settings.max_range_retries = retries;
    }

    let mut query = LogQuery::default();
    if let Some(address) = &args.address {
        query.address = Some(
            address
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", address, e))?,
        );
    }
    for topic in &args.topics {
        query = query.topic(parse_topic(topic)?);
    }

    let processor = if args.raw {
        None
    } else {
        let mut files = config.abi_files.clone();
        files.extend(args.abi.iter().cloned());
        if files.is_empty() {
            anyhow::bail!("No ABI files configured. Use --abi or pass --raw");
        }
        let registry = load_registry(&files)?;
        let mut processor = LogProcessor::new(LogDecoder::new(Arc::new(registry)));

        let exchange = match &args.exchange {
            Some(s) => Some(
                s.parse()
                    .map_err(|e| anyhow::anyhow!("Invalid exchange address '{}': {}", s, e))?,
            ),
            None => config.exchange_contract,
        };
        if let Some(exchange) = exchange {
            processor = processor.with_correlator(EventCorrelator::new(exchange));
        }
        Some(processor)
    };

    let to_block = if args.to_block.eq_ignore_ascii_case("latest") {
        RpcClient::from_config(&config)?.block_number().await?
    } else {
        args.to_block
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid end block '{}': {}", args.to_block, e))?
    };
    let range = BlockRange::new(args.from_block, to_block)?;

    let fetcher = LogRangeFetcher::from_url(&endpoint, Some(config.rpc.timeout()))?;

    let pb = if !quiet {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% ({msg})")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let pb_clone = pb.clone();
    let crawler = LogCrawler::new(fetcher, settings).with_progress(move |progress: CrawlProgress| {
        if let Some(ref pb) = pb_clone {
            pb.set_position(progress.percent() as u64);
            pb.set_message(format!(
                "{} logs, {} ranges pending",
                progress.logs_fetched, progress.pending_ranges
            ));
        }
    });

    let start = Instant::now();
    let report = crawler.crawl(&query, range).await;
    let elapsed = start.elapsed();

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    match &processor {
        Some(processor) => {
            let events = processor
                .process_logs(&report.logs)
                .ok_or_else(|| anyhow::anyhow!("Failed to decode fetched logs"))?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        None => println!("{}", serde_json::to_string_pretty(&report.logs)?),
    }

    if !quiet {
        eprintln!(
            "Fetched {} logs in {:.2}s ({} requests)",
            report.logs.len(),
            elapsed.as_secs_f64(),
            report.requests
        );
    }

    for failure in &report.failed {
        eprintln!(
            "Range {} failed (code {}): {}",
            failure.range,
            failure
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none".to_string()),
            failure.message
        );
    }
    if !report.is_complete() {
        anyhow::bail!("{} ranges could not be fetched", report.failed.len());
    }

    Ok(())
}
