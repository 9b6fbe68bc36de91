use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the directory scanned for one-time code files.
pub const CODES_DIR_ENV: &str = "CODES_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub codes: CodeConfig,
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the browsable and writable subtree.
    pub root_dir: PathBuf,
    /// Front-end assets served for every non-API path.
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    pub dir: PathBuf,
    pub extension: String,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            codes: CodeConfig::default(),
            tokens: TokenConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./files"),
            static_dir: PathBuf::from("./static"),
        }
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            extension: "code".to_string(),
            length: 8,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 120,
            sweep_interval_seconds: 60,
        }
    }
}

impl TokenConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(dir) = std::env::var(CODES_DIR_ENV) {
            if !dir.trim().is_empty() {
                app_config.codes.dir = PathBuf::from(dir);
            }
        }

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.storage.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Storage root directory cannot be empty".to_string(),
            ));
        }

        if self.codes.extension.is_empty() || self.codes.extension.contains('.') {
            return Err(ConfigError::Message(
                "Code file extension must be a non-empty name without dots".to_string(),
            ));
        }

        if self.codes.length == 0 {
            return Err(ConfigError::Message(
                "Code length must be greater than 0".to_string(),
            ));
        }

        if self.tokens.ttl_seconds == 0 {
            return Err(ConfigError::Message(
                "Token TTL must be greater than 0".to_string(),
            ));
        }

        if self.tokens.sweep_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Token sweep interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.storage.root_dir)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
