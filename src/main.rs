//! explorer-rpc CLI - resilient block explorer reads

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use explorer_rpc::RpcClient;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    // Offline commands need no configuration
    match &cli.command {
        Commands::ToHex { value, bits } => return cli::convert::to_hex(value, *bits),
        Commands::ToDec { value, bits } => return cli::convert::to_dec(value, *bits),
        Commands::Resolve { input } => return cli::convert::resolve(input),
        Commands::Config { action } => return cli::config::handle(action, cli.config.as_deref()),
        _ => {}
    }

    let config = cli::load_config(&cli)?;

    match &cli.command {
        Commands::Logs(args) => cli::logs::handle(args, config, cli.quiet).await,
        Commands::Receipt { hashes } => {
            let client = RpcClient::from_config(&config)?;
            cli::read::receipts(&client, hashes).await
        }
        Commands::BlockTime { blocks } => {
            let client = RpcClient::from_config(&config)?;
            cli::read::block_times(&client, blocks).await
        }
        Commands::BlockNumber => {
            let client = RpcClient::from_config(&config)?;
            cli::read::block_number(&client).await
        }
        Commands::Call(args) => {
            let client = RpcClient::from_config(&config)?;
            cli::read::call(&client, args).await
        }
        Commands::ToHex { .. }
        | Commands::ToDec { .. }
        | Commands::Resolve { .. }
        | Commands::Config { .. } => Ok(()),
    }
}
