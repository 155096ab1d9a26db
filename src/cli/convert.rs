//! Offline conversions: numeric codec and address/hash extraction

use explorer_rpc::links::{address_from_string, address_url, hash_from_string, tx_url};
use explorer_rpc::numeric::{decimal_to_hex, hex_to_decimal};

pub fn to_hex(value: &str, bits: u32) -> anyhow::Result<()> {
    let hex = decimal_to_hex(value.trim(), Some(bits))
        .map_err(|e| anyhow::anyhow!("Invalid number: {}", e))?;
    println!("0x{}", hex);
    Ok(())
}

pub fn to_dec(value: &str, bits: Option<u32>) -> anyhow::Result<()> {
    let dec = hex_to_decimal(value.trim(), bits).map_err(|e| anyhow::anyhow!("Invalid hex: {}", e))?;
    println!("{}", dec);
    Ok(())
}

pub fn resolve(input: &str) -> anyhow::Result<()> {
    if let Some(hash) = hash_from_string(input) {
        println!("tx       {:#x}", hash);
        println!("         {}", tx_url(&hash));
    } else if let Some(address) = address_from_string(input) {
        println!("address  {:#x}", address);
        println!("         {}", address_url(&address));
    } else {
        anyhow::bail!("No address or transaction hash found in '{}'", input);
    }
    Ok(())
}
