//! Backstop configuration
//!
//! Typed record loaded from the JSON configuration file. Covers the TSM
//! connection, the local maintenance command, log file rotation and the
//! Zabbix item that receives the outcome of each run.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dto::auth::Credentials;

/// Default TSM REST port
pub const DEFAULT_PORT: u16 = 8850;

/// Default TSM REST API version
pub const DEFAULT_API_VERSION: &str = "0.5";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Whole configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tsm: TsmSettings,

    /// Rolling log file; console only when absent
    #[serde(default)]
    pub logging: Option<LoggingSettings>,

    /// Monitoring item that receives run outcomes; disabled when absent
    #[serde(default)]
    pub zabbix: Option<ZabbixSettings>,
}

/// TSM connection and maintenance command settings
///
/// The API fields may be left out when only the local maintenance
/// command is used; [`TsmSettings::credentials`] checks them on demand.
#[derive(Clone, Deserialize)]
pub struct TsmSettings {
    /// Server URL without port (e.g., "https://tableau.example.com")
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// TSM ships a self-signed certificate, so verification is opt-in
    #[serde(default)]
    pub verify_certificates: bool,

    /// Extra arguments appended to `tsm maintenance backup`
    #[serde(default)]
    pub backup_args: Vec<String>,

    /// Passed as `-f <file>` to `tsm maintenance backup`
    #[serde(default)]
    pub backup_file: Option<String>,
}

impl std::fmt::Debug for TsmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsmSettings")
            .field("url", &self.url)
            .field("port", &self.port)
            .field("api_version", &self.api_version)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verify_certificates", &self.verify_certificates)
            .field("backup_args", &self.backup_args)
            .field("backup_file", &self.backup_file)
            .finish()
    }
}

impl TsmSettings {
    /// Server base URL including the port
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }

    /// Login credentials for the TSM API
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Invalid("tsm.url is required for API commands".into()));
        }
        if self.username.is_empty() {
            return Err(ConfigError::Invalid(
                "tsm.username is required for API commands".into(),
            ));
        }
        Ok(Credentials::new(self.username.clone(), self.password.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub file: PathBuf,

    /// Size at which the log file is rotated
    #[serde(default = "default_max_bytes", alias = "maxBytes")]
    pub max_bytes: usize,

    /// Number of rotated log files to keep
    #[serde(default = "default_backup_count", alias = "backupCount")]
    pub backup_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZabbixSettings {
    /// Path to the Zabbix agent configuration (ServerActive, Hostname)
    pub config: PathBuf,

    /// Item key that receives the outcome value
    pub item: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_backup_count() -> usize {
    5
}

impl Config {
    /// Reads, decodes and validates the configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.tsm.url;
        if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "tsm.url must start with http:// or https://".into(),
            ));
        }

        if self.tsm.api_version.is_empty() {
            return Err(ConfigError::Invalid("tsm.api_version cannot be empty".into()));
        }

        if let Some(logging) = &self.logging {
            if logging.max_bytes == 0 {
                return Err(ConfigError::Invalid("logging.max_bytes must be positive".into()));
            }
        }

        if let Some(zabbix) = &self.zabbix {
            if zabbix.item.is_empty() {
                return Err(ConfigError::Invalid("zabbix.item cannot be empty".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config() {
        let file = write_config(
            r#"{"tsm": {"url": "https://tableau.local", "username": "admin", "password": "pw"}}"#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.tsm.port, DEFAULT_PORT);
        assert_eq!(config.tsm.api_version, "0.5");
        assert!(!config.tsm.verify_certificates);
        assert!(config.tsm.backup_args.is_empty());
        assert!(config.logging.is_none());
        assert!(config.zabbix.is_none());
        assert_eq!(config.tsm.base_url(), "https://tableau.local:8850");
        assert_eq!(config.tsm.credentials().unwrap().name, "admin");
    }

    #[test]
    fn test_maintenance_only_config() {
        let file = write_config(r#"{"tsm": {"backup_file": "nightly"}}"#);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.tsm.backup_file.as_deref(), Some("nightly"));
        assert!(matches!(
            config.tsm.credentials(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"{
                "tsm": {
                    "url": "https://tableau.local/",
                    "port": 9000,
                    "username": "admin",
                    "password": "pw",
                    "backup_args": ["--override-disk-space-check"],
                    "backup_file": "nightly"
                },
                "logging": {"file": "/var/log/backstop.log", "maxBytes": 1024, "backupCount": 3},
                "zabbix": {"config": "/etc/zabbix/zabbix_agentd.conf", "item": "tableau.backup"}
            }"#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.tsm.base_url(), "https://tableau.local:9000");
        assert_eq!(config.tsm.backup_file.as_deref(), Some("nightly"));
        let logging = config.logging.unwrap();
        assert_eq!(logging.max_bytes, 1024);
        assert_eq!(logging.backup_count, 3);
        assert_eq!(config.zabbix.unwrap().item, "tableau.backup");
    }

    #[test]
    fn test_missing_required_field() {
        let file = write_config(r#"{"logging": {"file": "backstop.log"}}"#);
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/backstop.json"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let file = write_config(
            r#"{"tsm": {"url": "tableau.local", "username": "admin", "password": "pw"}}"#,
        );
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let file = write_config(
            r#"{"tsm": {"url": "https://tableau.local", "username": "", "password": "pw"}}"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert!(matches!(
            config.tsm.credentials(),
            Err(ConfigError::Invalid(_))
        ));

        let file = write_config(r#"{"tsm": {}, "logging": {"file": "x.log", "max_bytes": 0}}"#);
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_debug_hides_password() {
        let file = write_config(
            r#"{"tsm": {"url": "https://tableau.local", "username": "admin", "password": "hunter2"}}"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
