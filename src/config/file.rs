//! On-disk TOML configuration

use super::{ProxyConfig, RpcConfig};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`
///
/// ```toml
/// etherscan_api_key = "..."
/// exchange_contract = "0x8d12a197cb00d4747a1fe03395095ce2a5cc6819"
///
/// [rpc]
/// log_endpoint = "https://mainnet.infura.io/v3/KEY"
/// max_block_range = 2000
///
/// [abi]
/// files = ["abi/exchange.json"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Key for the proxy API; `ETHERSCAN_API_KEY` overrides it
    pub etherscan_api_key: Option<String>,

    /// Exchange contract whose events are correlated
    pub exchange_contract: Option<String>,

    pub rpc: RpcConfig,

    pub proxy: ProxyConfig,

    pub abi: AbiFiles,
}

/// `[abi]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbiFiles {
    /// ABI JSON files, registered in order
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl ConfigFile {
    /// `<config dir>/explorer-rpc/config.toml`
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("explorer-rpc").join("config.toml")
    }

    /// The file at [`default_path`](Self::default_path), if there is one
    pub fn load_default() -> Result<Option<Self>> {
        let path = Self::default_path();
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFile(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&text).map_err(ConfigError::ParseError)?)
    }

    /// Write the file, creating parent directories. The API key is kept at
    /// the top level; `[proxy]` never carries it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFile(format!("cannot encode config: {}", e)))?;

        let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir)?;
        }

        // Write beside the target and rename so a crash never leaves half a file
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("explorer-rpc-{}-{}", name, std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn test_parse_sections() {
        let text = r#"
etherscan_api_key = "abc"
exchange_contract = "0x8d12a197cb00d4747a1fe03395095ce2a5cc6819"

[rpc]
log_endpoint = "https://mainnet.infura.io/v3/abc"
concurrency = 10
timeout_seconds = 60

[proxy]
chain_id = 5

[abi]
files = ["abi/exchange.json", "abi/erc20.json"]
"#;

        let file: ConfigFile = toml::from_str(text).unwrap();
        assert_eq!(file.etherscan_api_key.as_deref(), Some("abc"));
        assert_eq!(file.rpc.concurrency, 10);
        assert_eq!(file.rpc.timeout_seconds, 60);
        assert_eq!(file.rpc.max_block_range, 5000);
        assert_eq!(file.proxy.chain_id, 5);
        assert_eq!(file.proxy.base_url, "https://api.etherscan.io/v2/api");
        assert_eq!(file.abi.files.len(), 2);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert!(file.etherscan_api_key.is_none());
        assert_eq!(file.rpc, RpcConfig::default());
        assert!(file.abi.files.is_empty());
    }

    #[test]
    fn test_api_key_not_written_under_proxy() {
        let mut file = ConfigFile::default();
        file.proxy.api_key = Some("secret".into());
        let text = toml::to_string_pretty(&file).unwrap();
        assert!(!text.contains("secret"));
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_path("save");
        let file = ConfigFile {
            etherscan_api_key: Some("key".into()),
            ..ConfigFile::default()
        };
        file.save(&path).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.etherscan_api_key.as_deref(), Some("key"));
        assert_eq!(loaded.rpc, RpcConfig::default());

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_load_errors() {
        assert!(ConfigFile::load(Path::new("/nonexistent/explorer-rpc.toml")).is_err());

        let path = scratch_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[rpc\nconcurrency = ").unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("parse error"));

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_default_path() {
        let path = ConfigFile::default_path();
        assert!(path.ends_with("explorer-rpc/config.toml"));
    }
}
