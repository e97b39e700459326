//! Server configuration.
//!
//! Loaded from an optional `config/caja.toml` and then `CAJA_*` environment
//! variables, which win over the file.

use serde::Deserialize;

use caja_core::DEFAULT_LOW_STOCK_THRESHOLD;

/// Development fallback. Refused by [`ServerConfig::validate`] in release
/// builds.
pub const DEV_JWT_SECRET: &str = "caja-dev-secret-change-in-production";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite file; `:memory:` for a throwaway database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// HS256 signing secret
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Token lifetime in seconds
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: i64,

    /// Default cut-off for the low-stock list
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_database_path() -> String {
    "./caja.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_token_lifetime() -> i64 {
    28_800 // 8 hours
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            jwt_secret: default_jwt_secret(),
            token_lifetime_secs: default_token_lifetime(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

impl ServerConfig {
    /// Loads `config/caja.toml` (if present) overlaid with `CAJA_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config: ServerConfig = config::Config::builder()
            .add_source(config::File::with_name("config/caja").required(false))
            .add_source(config::Environment::with_prefix("CAJA").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if !cfg!(debug_assertions) && self.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.token_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("token_lifetime_secs".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue("low_stock_threshold".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == ":memory:"
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error(transparent)]
    Source(#[from] config::ConfigError),
}
