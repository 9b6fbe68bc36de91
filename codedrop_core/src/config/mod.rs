//! Application configuration

pub mod settings;

pub use settings::{AppConfig, CodeConfig, ServerConfig, StorageConfig, TokenConfig};
