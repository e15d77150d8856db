//! Server configuration from command-line flags and environment variables.

use std::path::PathBuf;

use clap::Parser;
use notable_store::{Engine, StoreConfig};

/// Directory under the user's home holding the default store.
pub const DATA_DIR_NAME: &str = ".notable";

/// Server configuration.
///
/// Every flag can also be supplied through the environment variable named
/// in its help text. A restart re-executes the binary with the identical
/// argument vector, so whatever is configured here survives restarts.
#[derive(Debug, Clone, Parser)]
#[command(name = "notable")]
#[command(author, version, about = "Personal note-taking backend", long_about = None)]
pub struct ServerConfig {
    /// Bind address
    #[arg(long, env = "NOTABLE_BIND", default_value = "localhost")]
    pub bind: String,

    /// Port to listen on
    #[arg(long, env = "NOTABLE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// File system path to the note store (default: ~/.notable/notes.db)
    #[arg(long, env = "NOTABLE_DB")]
    pub db: Option<PathBuf>,

    /// Storage engine: redb (default) or sqlite
    #[arg(long, env = "NOTABLE_ENGINE", default_value_t = Engine::Redb)]
    pub engine: Engine,

    /// Restart the running instance instead of exiting when one is found
    #[arg(long)]
    pub restart: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "NOTABLE_LOG_JSON")]
    pub log_json: bool,
}

impl ServerConfig {
    /// Check values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "bind".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                name: "port".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` string used for both binding and probing.
    pub fn bind_target(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }

    /// Base URL of an instance serving on the configured address.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.bind_target())
    }

    /// Storage configuration, resolving the default path when `--db` is absent.
    pub fn store_config(&self) -> Result<StoreConfig, ConfigError> {
        match &self.db {
            Some(path) => Ok(StoreConfig::new(self.engine, path.clone())),
            None => {
                let home = home_dir().ok_or(ConfigError::MissingHomeDir)?;
                Ok(StoreConfig::in_dir(self.engine, &home.join(DATA_DIR_NAME)))
            }
        }
    }
}

/// The current user's home directory, from `HOME` or `USERPROFILE`.
fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(std::env::var_os)
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The default store location could not be derived.
    #[error("cannot determine the user home directory; pass --db explicitly")]
    MissingHomeDir,

    /// Invalid configuration value.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
