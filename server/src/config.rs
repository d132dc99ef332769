use docchat_core::config::GeminiConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_NAME: &str = "docchat";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration, loaded from TOML and overridden from the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP listener binds to
    pub http_addr: SocketAddr,
    /// Document the assistant answers from, read once at startup
    pub document_path: PathBuf,
    /// Upper bound on the streaming phase of a single request
    pub request_timeout_secs: u64,
    /// Send the text after the last word boundary once the model finishes
    pub flush_remainder: bool,
    pub gemini: GeminiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            document_path: PathBuf::from("resource/CV.pdf"),
            request_timeout_secs: 300,
            flush_remainder: true,
            gemini: GeminiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file that must exist
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `~/.config/docchat/config.toml` if present, otherwise the defaults
    pub fn load_from_default() -> Result<Self, ConfigError> {
        match default_config_file() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Rejects values that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Helper function to get default config file path
pub fn default_config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join(APP_NAME).join("config.toml"))
}
