//! Writes a fresh one-time access code into the configured code directory.

use anyhow::Result;
use codedrop_core::{AppConfig, CodeStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    let store = CodeStore::from_config(&config.codes);
    let code = store
        .mint(config.codes.length)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to write code file: {}", e))?;

    println!("{}", code);
    Ok(())
}
