//! Server configuration
//!
//! Layered with figment, lowest priority first:
//!
//! 1. the optional TOML file
//! 2. `APP_*` environment variables (`APP_READ_ONLY`, `APP_LOG_FILE`, ...)
//! 3. `GL_HOST`, which wins over `APP_GL_HOST`
//!
//! The access token only ever comes from `GITLAB_PERSONAL_ACCESS_TOKEN` and
//! is never read from or written to a file.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Data, Env, Format, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LoggingConfig;

pub const ENV_PREFIX: &str = "APP_";
pub const HOST_ENV: &str = "GL_HOST";
pub const TOKEN_ENV: &str = "GITLAB_PERSONAL_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Boxed to keep `Result<ServerConfig, ConfigError>` small
    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),

    #[error("GITLAB_PERSONAL_ACCESS_TOKEN not set")]
    MissingToken,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Register only the read-only tools
    pub read_only: bool,
    /// Write the translation keys used to `translations_file` or the default dump file
    pub export_translations: bool,
    pub translations_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    /// Log every protocol line
    pub enable_command_logging: bool,
    pub verbose: bool,
    pub gitlab_host: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::extract(Figment::from(Toml::string(content)))
    }

    /// Read a TOML file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::extract(Figment::from(toml_file(path)?))
    }

    /// The provider stack [`ServerConfig::load`] extracts from.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(toml_file(path)?);
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["token"]))
            .merge(Env::raw().only(&[HOST_ENV]).map(|_| "gitlab_host".into())))
    }

    /// File values (when a path is given) overlaid with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::extract(Self::figment(path)?)?;
        config.token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
        Ok(config)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        Ok(config.without_empty_values())
    }

    /// An empty string in the file or environment means unset.
    fn without_empty_values(mut self) -> Self {
        self.gitlab_host = self.gitlab_host.filter(|h| !h.is_empty());
        self.translations_file = self
            .translations_file
            .filter(|p| !p.as_os_str().is_empty());
        self.log_file = self.log_file.filter(|p| !p.as_os_str().is_empty());
        self
    }

    /// The access token, or [`ConfigError::MissingToken`].
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::MissingToken)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            verbose: self.verbose,
            log_file: self.log_file.clone(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("read_only", &self.read_only)
            .field("export_translations", &self.export_translations)
            .field("translations_file", &self.translations_file)
            .field("log_file", &self.log_file)
            .field("enable_command_logging", &self.enable_command_logging)
            .field("verbose", &self.verbose)
            .field("gitlab_host", &self.gitlab_host)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// `Toml::file` treats a missing file as empty; an explicit path must exist.
fn toml_file(path: &Path) -> Result<Data<Toml>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    Ok(Toml::file(path))
}
