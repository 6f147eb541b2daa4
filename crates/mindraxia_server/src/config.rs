//! Layered server configuration.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. TOML file (`mindraxia.toml` unless a path is given)
//! 3. `MINDRAXIA_` environment variables, `__` separating sections
//!    (`MINDRAXIA_SERVER__BIND=0.0.0.0:8080`)

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mindraxia.toml";

const ENV_PREFIX: &str = "MINDRAXIA_";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug)]
pub enum ConfigError {
    Load(Box<figment::Error>),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "failed to load configuration: {err}"),
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err.as_ref()),
            Self::Invalid(_) => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Load(Box::new(value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    pub dir: PathBuf,
}

/// Values shown on server-rendered pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    /// Public origin, e.g. `https://blog.example.org`; empty for relative links.
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/mindraxia.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: mindraxia_core::default_log_level().to_string(),
            dir: PathBuf::from("logs"),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Mindraxia".to_string(),
            base_url: String::new(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or [`DEFAULT_CONFIG_FILE`] when `None`.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database.path must not be empty".to_string(),
            ));
        }
        let level = self.logging.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level `{}` is not one of {}",
                self.logging.level,
                LOG_LEVELS.join("|")
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.trim().parse().map_err(|err| {
            ConfigError::Invalid(format!("server.bind `{}`: {err}", self.server.bind))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
        assert_eq!(config.site.title, "Mindraxia");
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[server]\nbind = \"0.0.0.0:9000\"\n\n[site]\ntitle = \"Notes on Rings\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.site.title, "Notes on Rings");
        assert_eq!(config.logging, Config::default().logging);
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.database.path = Default::default();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("database.path"));

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
