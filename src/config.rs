//! Configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. a TOML file (`config/relay.toml` by default)
//! 2. environment variables prefixed with `VITALS_RELAY_` (double underscore
//!    separates sections, e.g. `VITALS_RELAY_SERVER__PORT=8080`)
//!
//! Every field carries a serde default, so the relay starts with no
//! configuration file at all.
//!
//! # Example
//! ```no_run
//! use vitals_relay::config::RelayConfig;
//!
//! # fn main() -> Result<(), vitals_relay::RelayError> {
//! let config = RelayConfig::load()?;
//! println!("Application: {}", config.application.name);
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Sink and counter file locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Dashboard login credentials
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Sink and counter file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the ledger, mirror, and counter files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Row-oriented CSV ledger file name
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
    /// Arrow IPC tabular mirror file name
    #[serde(default = "default_mirror_file")]
    pub mirror_file: String,
    /// Persisted patient counter file name
    #[serde(default = "default_counter_file")]
    pub counter_file: String,
}

/// Dashboard login credentials. Both fields empty (the default) disables the
/// login route: every attempt is rejected until credentials are configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl AuthConfig {
    pub fn enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

fn default_app_name() -> String {
    "vitals-relay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_ledger_file() -> String {
    "patient_data.csv".to_string()
}

fn default_mirror_file() -> String {
    "patient_data.arrow".to_string()
}

fn default_counter_file() -> String {
    "patient_counter.json".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_file: default_ledger_file(),
            mirror_file: default_mirror_file(),
            counter_file: default_counter_file(),
        }
    }
}

impl ServerConfig {
    /// Resolved listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, RelayError> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| RelayError::Configuration(format!("invalid bind address: {e}")))
    }
}

impl StorageConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.data_dir.join(&self.mirror_file)
    }

    pub fn counter_path(&self) -> PathBuf {
        self.data_dir.join(&self.counter_file)
    }
}

impl RelayConfig {
    /// Load configuration from `config/relay.toml` and environment variables.
    pub fn load() -> Result<Self, RelayError> {
        Self::load_from("config/relay.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, RelayError> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("VITALS_RELAY_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            ));
        }

        if self.server.socket_addr().is_err() {
            return Err(format!(
                "Invalid bind address '{}:{}'",
                self.server.bind, self.server.port
            ));
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err("storage.data_dir must not be empty".to_string());
        }

        for (label, name) in [
            ("storage.ledger_file", &self.storage.ledger_file),
            ("storage.mirror_file", &self.storage.mirror_file),
            ("storage.counter_file", &self.storage.counter_file),
        ] {
            if name.is_empty() {
                return Err(format!("{label} must not be empty"));
            }
        }

        Ok(())
    }
}
