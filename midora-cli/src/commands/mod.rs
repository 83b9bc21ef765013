pub mod chat;
pub mod completion;
pub mod config;
pub mod follow;
pub mod session;

use anyhow::{Context, Result};
use midora_client::AppContext;
use midora_shared::config::ClientConfig;
use std::path::PathBuf;

/// Resolves configuration and builds the application context every
/// command starts from.
pub fn build_context(config_path: Option<PathBuf>) -> Result<AppContext> {
    let config = ClientConfig::load_config(config_path)
        .map_err(|err| anyhow::anyhow!("failed to load configuration: {err}"))?;
    AppContext::initialize(config).context("failed to initialize client")
}
