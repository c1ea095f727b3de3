//! Config command - read and write configuration values

use std::path::Path;

use crate::cli::ConfigCommands;
use crate::config::{CONFIG_KEYS, RepotagConfig};
use crate::RepotagError;

type Result<T> = std::result::Result<T, RepotagError>;

/// Execute the config command against the file at `config_path`
///
/// # Errors
/// Returns an error for malformed `key=value` settings, unknown keys,
/// invalid values, or if the file cannot be written
pub fn execute(mut config: RepotagConfig, config_path: &Path, command: &ConfigCommands, quiet: bool) -> Result<()> {
    match command {
        ConfigCommands::Set { setting } => {
            let parts: Vec<&str> = setting.splitn(2, '=').collect();
            if parts.len() != 2 {
                return Err(RepotagError::InvalidInput(
                    "Invalid format. Use: repotag config set key=value".into(),
                ));
            }

            let key = parts[0].trim();
            let value = parts[1].trim();
            config.set_value(key, value)?;
            config.save_to(config_path)?;
            tracing::debug!(key, value, path = %config_path.display(), "saved configuration");
            if !quiet {
                println!("Set {key} = {value}");
            }
        }
        ConfigCommands::Get { key } => {
            let value = config.get_value(key).ok_or_else(|| {
                RepotagError::InvalidInput(format!(
                    "Unknown configuration key: '{key}'. Available keys: {}",
                    CONFIG_KEYS.join(", ")
                ))
            })?;
            println!("{value}");
        }
        ConfigCommands::Path => println!("{}", config_path.display()),
    }
    Ok(())
}
