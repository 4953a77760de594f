//! Application configuration
//!
//! Configuration is layered the usual way: built-in defaults, then optional
//! `config/*` files, then `CHATVAULT_`-prefixed environment variables.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// SQLite database settings
    pub database: DatabaseConfig,
    /// Media storage settings
    pub storage: StorageConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Import pipeline settings
    pub import: ImportConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:8361`
    pub listen_addr: String,
}

/// SQLite database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub path: String,
    /// Connection pool size
    pub max_connections: u32,
}

/// Media storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for extracted media, one subdirectory per export
    pub root: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Optional log file directory; JSON lines when set
    pub file_path: Option<String>,
}

/// Import pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Maximum accepted upload size in megabytes
    pub max_upload_mb: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "127.0.0.1:8361".to_string(),
            },
            database: DatabaseConfig {
                path: "data/chatvault.db".to_string(),
                max_connections: 10,
            },
            storage: StorageConfig {
                root: "storage".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
            },
            import: ImportConfig { max_upload_mb: 512 },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("CHATVAULT").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "Invalid listen address: {}",
                self.server.listen_addr
            ));
        }

        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database path cannot be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }

        if self.storage.root.trim().is_empty() {
            return Err(anyhow::anyhow!("storage root cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        if self.import.max_upload_mb == 0 {
            return Err(anyhow::anyhow!("max_upload_mb must be greater than 0"));
        }

        Ok(())
    }

    /// Maximum accepted upload size in bytes
    #[must_use]
    pub const fn max_upload_bytes(&self) -> usize {
        (self.import.max_upload_mb as usize) * 1024 * 1024
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8361");
        assert_eq!(config.database.path, "data/chatvault.db");
        assert_eq!(config.import.max_upload_mb, 512);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_listen_addr() {
        let mut config = AppConfig::default();
        config.server.listen_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_pool_size() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "chatty".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_upload_bytes() {
        let mut config = AppConfig::default();
        config.import.max_upload_mb = 2;
        assert_eq!(config.max_upload_bytes(), 2 * 1024 * 1024);
    }
}
