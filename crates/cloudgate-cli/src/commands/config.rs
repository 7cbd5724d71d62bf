//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the effective configuration with literal secrets masked.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let rendered = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::config(format!("failed to serialize config: {e}")))?;
    println!("# config.toml ({})", path.display());
    println!("{rendered}");
    Ok(())
}

pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    if config.credentials.identifier.is_some() {
        println!("Inline credentials resolved.");
    }
    println!("Configuration is valid.");
    Ok(())
}

pub fn path(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    println!(
        "reminders: {}",
        config.reminders.resolved_store_path().display()
    );
    Ok(())
}
