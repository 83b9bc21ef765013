use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use midora_shared::config::ClientConfig;

/// Writes the built-in defaults as a TOML configuration file.
pub fn generate_config(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from("midora.toml"));
    let config = ClientConfig::with_defaults();
    let serialized =
        toml::to_string_pretty(&config).context("failed to serialize configuration")?;

    fs::write(&path, serialized)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Configuration file '{}' generated successfully.", path.display());
    Ok(())
}
