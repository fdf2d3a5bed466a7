use crate::core::db::DriverKind;
use crate::core::{Result, TablekitError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: Option<LoggingConfig>,
}

/// Connection settings: which driver to use and where to connect.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    pub driver: DriverKind,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Database (schema) name on the server
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// SQLite database file, or `:memory:`
    pub path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `tablekit=debug`
    pub filter: Option<String>,
}

impl DatabaseConfig {
    /// MySQL server `host`, database `database`
    pub fn mysql(
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        DatabaseConfig {
            driver: DriverKind::Mysql,
            host: Some(host.into()),
            port: None,
            name: Some(database.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            path: None,
        }
    }

    /// SQLite database file at `path`
    pub fn sqlite(path: impl Into<String>) -> Self {
        DatabaseConfig {
            driver: DriverKind::Sqlite,
            host: None,
            port: None,
            name: None,
            username: None,
            password: None,
            path: Some(path.into()),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Checks that the settings required by the driver are present
    pub fn validate(&self) -> Result<()> {
        match self.driver {
            DriverKind::Sqlite => {
                self.sqlite_path()?;
            }
            DriverKind::Mysql => {
                if self.name.as_deref().map_or(true, str::is_empty) {
                    return Err(TablekitError::Config(
                        "mysql driver requires a database name".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn sqlite_path(&self) -> Result<&str> {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => Ok(path),
            _ => Err(TablekitError::Config("sqlite driver requires a path".to_string())),
        }
    }

    /// Data-source name, e.g. `mysql:host=localhost;dbname=shop`
    ///
    /// Credentials are never part of the DSN.
    pub fn dsn(&self) -> String {
        match self.driver {
            DriverKind::Sqlite => format!("sqlite:{}", self.path.as_deref().unwrap_or("")),
            DriverKind::Mysql => {
                let mut dsn = format!(
                    "mysql:host={};dbname={}",
                    self.host.as_deref().unwrap_or("localhost"),
                    self.name.as_deref().unwrap_or("")
                );
                if let Some(port) = self.port {
                    dsn.push_str(&format!(";port={}", port));
                }
                dsn
            }
        }
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = tablekit::config::load_config("tablekit.toml").expect("Failed to load config");
/// println!("{}", config.database.dsn());
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|e| TablekitError::Config(e.to_string()))?;
    config.database.validate()?;
    Ok(config)
}
