//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Warehouse credentials normally come from the environment (optionally via
//! a `.env` file loaded by the binaries); a TOML file can supply the rest.
//!
//! Credentials are checked for presence only, and only when the warehouse
//! connects: a missing value shows up as a connection failure at startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which warehouse implementation to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    #[default]
    Snowflake,
    Sqlite,
}

impl std::str::FromStr for WarehouseBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snowflake" => Ok(WarehouseBackend::Snowflake),
            "sqlite" => Ok(WarehouseBackend::Sqlite),
            other => Err(ConfigError::InvalidValue {
                key: "DASHBOARD_WAREHOUSE_BACKEND".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Warehouse connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default)]
    pub backend: WarehouseBackend,

    pub user: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
    pub warehouse: Option<String>,
    /// Database name; for the sqlite backend, the path of the database file
    pub database: Option<String>,
    pub schema: Option<String>,

    /// Source table holding one row per (location, date)
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_table() -> String {
    "owid_covid2".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: WarehouseBackend::default(),
            user: None,
            password: None,
            account: None,
            warehouse: None,
            database: None,
            schema: None,
            table: default_table(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8501
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        check_table_name("warehouse.table", &config.warehouse.table)?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("pandemic-dashboard").join("config.toml")),
            Some(PathBuf::from("/etc/pandemic-dashboard/config.toml")),
            Some(PathBuf::from("./dashboard.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Warehouse connection
        let wh = &mut self.warehouse;
        for (key, slot) in [
            ("SNOWFLAKE_USER", &mut wh.user),
            ("SNOWFLAKE_PASSWORD", &mut wh.password),
            ("SNOWFLAKE_ACCOUNT", &mut wh.account),
            ("SNOWFLAKE_WAREHOUSE", &mut wh.warehouse),
            ("SNOWFLAKE_DATABASE", &mut wh.database),
            ("SNOWFLAKE_SCHEMA", &mut wh.schema),
        ] {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }

        if let Some(backend) = lookup("DASHBOARD_WAREHOUSE_BACKEND") {
            wh.backend = backend.parse()?;
        }
        if let Some(table) = lookup("DASHBOARD_TABLE") {
            check_table_name("DASHBOARD_TABLE", &table)?;
            wh.table = table;
        }

        // Server overrides
        if let Some(host) = lookup("DASHBOARD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DASHBOARD_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DASHBOARD_PORT".to_string(),
                value: port.clone(),
            })?;
        }

        // Logging overrides
        if let Some(level) = lookup("DASHBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("DASHBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// HTTP server settings in the form the API layer takes
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.server.host.clone(), self.server.port)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// The table name is spliced into SQL text, so it must be a plain or
/// dot-qualified identifier: `owid_covid2`, `analytics.public.owid_covid2`.
fn check_table_name(key: &str, name: &str) -> Result<(), ConfigError> {
    let is_identifier = |part: &str| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    };

    if name.split('.').all(is_identifier) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: name.to_string(),
        })
    }
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Pandemic Dashboard Configuration
#
# Environment variables override these settings:
# - SNOWFLAKE_USER, SNOWFLAKE_PASSWORD, SNOWFLAKE_ACCOUNT
# - SNOWFLAKE_WAREHOUSE, SNOWFLAKE_DATABASE, SNOWFLAKE_SCHEMA
# - DASHBOARD_WAREHOUSE_BACKEND, DASHBOARD_TABLE
# - DASHBOARD_HOST, DASHBOARD_PORT
# - DASHBOARD_LOG_LEVEL, DASHBOARD_LOG_FORMAT
#
# A .env file in the working directory is read before the environment.

[warehouse]
# Backend: snowflake or sqlite
backend = "snowflake"

# Credentials are best kept in the environment
# user = ""
# password = ""
# account = ""
# warehouse = ""
# database = ""   # for sqlite: path to the database file
# schema = ""

# Source table with one row per (location, date)
table = "owid_covid2"

# HTTP timeout for warehouse requests (seconds)
request_timeout_secs = 60

[server]
host = "0.0.0.0"
port = 8501

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.warehouse.backend, WarehouseBackend::Snowflake);
        assert_eq!(config.warehouse.table, "owid_covid2");
        assert!(config.warehouse.user.is_none());
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("SNOWFLAKE_USER", "analyst"),
                ("SNOWFLAKE_ACCOUNT", "xy12345"),
                ("DASHBOARD_WAREHOUSE_BACKEND", "SQLite"),
                ("DASHBOARD_PORT", "9000"),
            ]))
            .unwrap();

        assert_eq!(config.warehouse.user.as_deref(), Some("analyst"));
        assert_eq!(config.warehouse.account.as_deref(), Some("xy12345"));
        assert!(config.warehouse.password.is_none());
        assert_eq!(config.warehouse.backend, WarehouseBackend::Sqlite);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_credentials_are_not_validated() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[("SNOWFLAKE_PASSWORD", "")]))
            .unwrap();
        assert_eq!(config.warehouse.password.as_deref(), Some(""));
    }

    #[test]
    fn test_invalid_port() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("DASHBOARD_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        for bad in ["owid; DROP TABLE x", "", "a..b", "1table", "t -- x", "\"quoted\""] {
            let mut config = Config::default();
            let err = config
                .apply_overrides(lookup(&[("DASHBOARD_TABLE", bad)]))
                .unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { key, .. } if key == "DASHBOARD_TABLE"),
                "{bad:?} accepted"
            );
            assert_eq!(config.warehouse.table, "owid_covid2");
        }

        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[("DASHBOARD_TABLE", "analytics.public.owid_covid2")]))
            .unwrap();
        assert_eq!(config.warehouse.table, "analytics.public.owid_covid2");
    }

    #[test]
    fn test_file_table_name_is_checked() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[warehouse]\ntable = \"owid_covid2 WHERE 1=1\"").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[warehouse]\nbackend = \"sqlite\"\ndatabase = \"covid.db\"\n\n[server]\nport = 8600"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.warehouse.backend, WarehouseBackend::Sqlite);
        assert_eq!(config.warehouse.database.as_deref(), Some("covid.db"));
        assert_eq!(config.warehouse.table, "owid_covid2");
        assert_eq!(config.server.port, 8600);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.warehouse.table, "owid_covid2");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
