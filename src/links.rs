//! Address/hash extraction from user input and plain explorer URLs
//!
//! Validation is purely syntactic (`0x` + 40 or 64 hex digits); checksums
//! are never verified.

use alloy::primitives::{Address, B256};

/// Explorer used for generated links
pub const EXPLORER_URL: &str = "https://etherscan.io";

/// Markers that precede a value embedded in a URL, in priority order
const URL_PREFIXES: [&str; 3] = ["/0x", "=0x", "#0x"];

/// `0x` followed by 40 hex digits
pub fn is_address(s: &str) -> bool {
    is_prefixed_hex(s, 40)
}

/// `0x` followed by 64 hex digits
pub fn is_hash(s: &str) -> bool {
    is_prefixed_hex(s, 64)
}

fn is_prefixed_hex(s: &str, digits: usize) -> bool {
    s.len() == digits + 2
        && s.starts_with("0x")
        && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

fn normalize(input: &str) -> String {
    input.trim().to_lowercase().replace('.', " ")
}

/// The `0x`-value following the first URL marker, cut to `digits` hex digits
fn embedded_value(input: &str, digits: usize) -> Option<&str> {
    let index = URL_PREFIXES.iter().find_map(|p| input.find(p))?;
    let start = index + 1;
    let end = (start + digits + 2).min(input.len());
    input.get(start..end)
}

/// Extract an address from a bare address, a 40-digit value without `0x`,
/// or a URL containing one (transaction URLs excluded)
pub fn address_from_string(input: &str) -> Option<Address> {
    let input = normalize(input);
    if input.is_empty() {
        return None;
    }

    let candidate = if is_address(&input) {
        Some(input.clone())
    } else if input.len() == 40 && !input.starts_with("0x") {
        Some(format!("0x{}", input))
    } else {
        None
    };

    let candidate = candidate.filter(|c| is_address(c)).or_else(|| {
        if input.contains("0x") && !input.contains("/tx") {
            embedded_value(&input, 40)
                .filter(|v| is_address(v))
                .map(String::from)
        } else {
            None
        }
    })?;

    candidate.parse().ok()
}

/// Extract a transaction hash from a bare hash, a 64-digit value without
/// `0x`, or a URL containing one
pub fn hash_from_string(input: &str) -> Option<B256> {
    let input = normalize(input);
    if input.is_empty() {
        return None;
    }

    let candidate = if input.len() == 66 && input.starts_with("0x") {
        input.clone()
    } else if input.len() == 64 && !input.starts_with("0x") {
        format!("0x{}", input)
    } else if input.contains("0x") {
        embedded_value(&input, 64)?.to_string()
    } else {
        return None;
    };

    if is_hash(&candidate) {
        candidate.parse().ok()
    } else {
        None
    }
}

pub fn tx_url(hash: &B256) -> String {
    format!("{}/tx/{:#x}", EXPLORER_URL, hash)
}

pub fn address_url(address: &Address) -> String {
    format!("{}/address/{:#x}", EXPLORER_URL, address)
}

/// Token page, optionally filtered to one ERC-721 id
pub fn token_url(token: &Address, erc721_id: Option<&str>) -> String {
    match erc721_id {
        Some(id) if !id.is_empty() => format!("{}/token/{:#x}?a={}", EXPLORER_URL, token, id),
        _ => format!("{}/token/{:#x}", EXPLORER_URL, token),
    }
}
