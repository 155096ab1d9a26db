//! Loading interface descriptors from local JSON files

use super::AbiRegistry;
use crate::error::{AbiError, Result};
use alloy::json_abi::JsonAbi;
use std::path::{Path, PathBuf};

/// Load an ABI from a JSON file.
///
/// Accepts either a bare ABI array or a compiler artifact with an `abi` key.
pub fn load_abi_file(path: &Path) -> Result<JsonAbi> {
    if !path.exists() {
        return Err(AbiError::FileNotFound(path.display().to_string()).into());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| AbiError::FileNotFound(format!("{}: {}", path.display(), e)))?;

    parse_abi(&content)
        .map_err(|e| AbiError::ParseError(format!("{}: {}", path.display(), e)).into())
}

/// Build a registry from ABI files, in the given priority order
pub fn load_registry(paths: &[PathBuf]) -> Result<AbiRegistry> {
    let mut registry = AbiRegistry::new();
    for path in paths {
        let abi = load_abi_file(path)?;
        if !registry.add_interface(abi) {
            tracing::debug!("Duplicate ABI file {}", path.display());
        }
    }
    tracing::debug!(
        "Registered {} interfaces ({} events, {} functions)",
        registry.interface_count(),
        registry.event_count(),
        registry.function_count()
    );
    Ok(registry)
}

fn parse_abi(content: &str) -> std::result::Result<JsonAbi, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    match value {
        serde_json::Value::Object(mut artifact) if artifact.contains_key("abi") => {
            serde_json::from_value(artifact.remove("abi").unwrap_or_default())
        }
        other => serde_json::from_value(other),
    }
}
