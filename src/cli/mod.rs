//! CLI command modules
//!
//! Each subcommand has its own module with argument definitions and handlers.

pub mod config;
pub mod convert;
pub mod logs;
pub mod read;

use clap::{Args, Parser, Subcommand};
use explorer_rpc::{Config, ConfigFile};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "explorer-rpc")]
#[command(
    version,
    about = "Resilient block explorer reads: logs, receipts, block times and contract calls"
)]
#[command(after_help = r#"EXAMPLES:
    # Fetch exchange logs, splitting ranges the node rejects as too large
    explorer-rpc --rpc https://mainnet.infura.io/v3/KEY logs \
                 -a 0x8d12A197cB00D4747a1fe03395095ce2A5CC6819 \
                 -f 3154197 -t 3160000 --abi exchange.json

    # Receipt for a transaction (hash or explorer URL)
    explorer-rpc receipt https://etherscan.io/tx/0x...

    # Read contract state through the proxy API
    explorer-rpc call 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 "decimals() returns (uint8)"

    # Two's complement hex of a negative value
    explorer-rpc to-hex -- -1

ENVIRONMENT VARIABLES:
    ETHERSCAN_API_KEY    Etherscan API key (optional, increases rate limit)

CONFIG FILE:
    Default: ~/.config/explorer-rpc/config.toml
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub endpoints: EndpointArgs,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct EndpointArgs {
    /// JSON-RPC endpoint for eth_getLogs
    #[arg(long = "rpc", global = true)]
    pub log_endpoint: Option<String>,

    /// Live node tried before the proxy API
    #[arg(long = "live-rpc", global = true)]
    pub live_endpoint: Option<String>,

    /// Etherscan API key
    #[arg(long, env = "ETHERSCAN_API_KEY", global = true, hide_env_values = true)]
    pub etherscan_key: Option<String>,

    /// Chain id passed to the proxy API
    #[arg(long, global = true)]
    pub chain_id: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and decode logs over a block range
    Logs(Box<logs::LogsArgs>),

    /// Transaction receipt(s)
    Receipt {
        /// Transaction hashes or explorer URLs
        #[arg(required = true, num_args = 1..)]
        hashes: Vec<String>,
    },

    /// Block timestamp(s)
    BlockTime {
        /// Block numbers
        #[arg(required = true, num_args = 1..)]
        blocks: Vec<u64>,
    },

    /// Current block number
    BlockNumber,

    /// Call a read-only contract function
    ///
    /// Examples:
    ///   explorer-rpc call 0xA0b8...eB48 "balanceOf(address) returns (uint256)" 0xd8dA...6045
    ///   explorer-rpc call 0x8d12...6819 balanceOf 0x0 0xd8dA...6045 --abi exchange.json
    Call(read::CallArgs),

    /// Convert decimal to hex (negative values as two's complement)
    ToHex {
        /// Decimal number
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Bit width for negative values
        #[arg(long, default_value = "32")]
        bits: u32,
    },

    /// Convert hex to decimal
    ToDec {
        /// Hex number (with or without 0x prefix)
        value: String,

        /// Saturate to 2^bits when the high half is set
        #[arg(long)]
        bits: Option<u32>,
    },

    /// Extract an address or transaction hash from text or a URL
    Resolve {
        /// Input string
        input: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigCommands,
    },
}

/// Load the config file and apply command-line overrides
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let file = match &cli.config {
        Some(path) => Some(ConfigFile::load(path)?),
        None => ConfigFile::load_default()?,
    };

    let mut builder = Config::builder();
    if let Some(file) = &file {
        builder = builder.file(file);
    }

    let args = &cli.endpoints;
    if let Some(url) = &args.log_endpoint {
        builder = builder.log_endpoint(url);
    }
    if let Some(url) = &args.live_endpoint {
        builder = builder.live_endpoint(url);
    }
    if let Some(key) = &args.etherscan_key {
        builder = builder.api_key(key);
    }
    if let Some(id) = args.chain_id {
        builder = builder.chain_id(id);
    }
    if let Some(secs) = args.timeout {
        builder = builder.timeout_seconds(secs);
    }

    Ok(builder.build()?)
}
