use clinobs_core::{SchemaVariant, ValidationOptions};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Which create schema the service enforces
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub storage: StorageConfig,
}

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("{0}")]
    Invalid(String),
}

impl AppConfig {
    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.server.port == 0 {
            return invalid("server.port must be non-zero".into());
        }
        if self.server.body_limit_bytes == 0 {
            return invalid("server.body_limit_bytes must be non-zero".into());
        }
        if !LOG_LEVELS
            .iter()
            .any(|lvl| lvl.eq_ignore_ascii_case(&self.logging.level))
        {
            return invalid(format!("logging.level must be one of {LOG_LEVELS:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        let host = self
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or(std::net::Ipv4Addr::UNSPECIFIED.into());
        SocketAddr::new(host, self.server.port)
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            variant: self.validation.variant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    4000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationSettings {
    /// `base` ignores any caller id; `extended` requires one
    #[serde(default)]
    pub variant: SchemaVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Synthetic observations inserted at startup
    #[serde(default)]
    pub seed_observations: usize,
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "clinobs.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        let mut builder = Config::builder();
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CLINOBS__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("CLINOBS")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.addr().to_string(), "0.0.0.0:4000");
        assert_eq!(cfg.validation.variant, SchemaVariant::Base);
        assert_eq!(cfg.storage.seed_observations, 0);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("port"));

        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.server.body_limit_bytes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unparsable_host_falls_back_to_any() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "not-an-ip".into();
        cfg.server.port = 9090;
        assert_eq!(cfg.addr().to_string(), "0.0.0.0:9090");
    }
}
