//! Single-value reads through the live/proxy client

use clap::Args;
use explorer_rpc::links::{address_from_string, hash_from_string};
use explorer_rpc::{load_abi_file, ContractCall, DecodedValue, Indexed, InputError, RpcClient};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct CallArgs {
    /// Contract address
    pub address: String,

    /// Function signature, or a function name when --abi is given
    pub function: String,

    /// Function arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// ABI file describing the contract
    #[arg(long)]
    pub abi: Option<PathBuf>,
}

pub async fn receipts(client: &RpcClient, inputs: &[String]) -> anyhow::Result<()> {
    let hashes = inputs
        .iter()
        .map(|s| hash_from_string(s).ok_or_else(|| InputError::InvalidHash(s.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = client.transaction_receipts(&hashes).await;
    Indexed::sort(&mut results);

    let mut failed = 0;
    for Indexed { index, result } in results {
        match result {
            Ok(Some(receipt)) => println!("{}", serde_json::to_string_pretty(&receipt)?),
            Ok(None) => println!("{:#x}: not found", hashes[index]),
            Err(e) => {
                failed += 1;
                eprintln!("{:#x}: {}", hashes[index], e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} receipts failed", failed, hashes.len());
    }
    Ok(())
}

pub async fn block_times(client: &RpcClient, blocks: &[u64]) -> anyhow::Result<()> {
    let mut results = client.block_times(blocks).await;
    Indexed::sort(&mut results);

    let mut failed = 0;
    for Indexed { index, result } in results {
        match result {
            Ok(time) => println!("{}", serde_json::to_string(&time)?),
            Err(e) => {
                failed += 1;
                eprintln!("block {}: {}", blocks[index], e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} block times failed", failed, blocks.len());
    }
    Ok(())
}

pub async fn block_number(client: &RpcClient) -> anyhow::Result<()> {
    let number = client.block_number().await?;
    println!("{}", number);
    Ok(())
}

pub async fn call(client: &RpcClient, args: &CallArgs) -> anyhow::Result<()> {
    let address = address_from_string(&args.address)
        .ok_or_else(|| InputError::InvalidAddress(args.address.clone()))?;

    let call = match &args.abi {
        Some(path) => ContractCall::new(address, Arc::new(load_abi_file(path)?), &args.function),
        None => ContractCall::from_signature(address, &args.function)?,
    }
    .with_str_args(args.args.as_slice())?;

    let values = client.call(&call).await?;
    let decoded: Vec<DecodedValue> = values.iter().map(DecodedValue::from).collect();
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}
