//! `config` subcommands

use clap::Subcommand;
use explorer_rpc::ConfigFile;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the config file location
    Path,

    /// Store the Etherscan API key in the config file
    SetEtherscanKey {
        /// API key
        key: String,
    },

    /// Print the config file
    Show,
}

pub fn handle(action: &ConfigCommands, path: Option<&Path>) -> anyhow::Result<()> {
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => ConfigFile::default_path(),
    };

    match action {
        ConfigCommands::Path => println!("{}", path.display()),

        ConfigCommands::SetEtherscanKey { key } => {
            let mut file = if path.is_file() {
                ConfigFile::load(&path)?
            } else {
                ConfigFile::default()
            };
            file.etherscan_api_key = Some(key.trim().to_string());
            file.save(&path)?;
            eprintln!("Saved API key to {}", path.display());
        }

        ConfigCommands::Show => {
            if !path.is_file() {
                anyhow::bail!(
                    "{} does not exist (try `explorer-rpc config set-etherscan-key <KEY>`)",
                    path.display()
                );
            }
            // Parse first so a broken file is reported rather than echoed
            let file = ConfigFile::load(&path)?;
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&file)?);
        }
    }

    Ok(())
}
