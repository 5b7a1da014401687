use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::security::SecurityConfig;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::{duration, parse_default};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// JSON security document, alternative to an inline `[security]` table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_file: Option<PathBuf>,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub playlist: PlaylistSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSettings {
    /// Provider configuration document
    #[serde(default = "default_playlist_config_path")]
    pub config_path: PathBuf,
    #[serde(default = "default_refresh_interval", with = "duration")]
    pub refresh_interval: Duration,
    /// Upper bound for a single provider fetch
    #[serde(default = "default_fetch_timeout", with = "duration")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accepted bearer tokens
    #[serde(default)]
    pub api_tokens: Vec<String>,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// bcrypt hash, see the `hash-password` command
    pub password_hash: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_playlist_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_PLAYLIST_CONFIG_PATH)
}

fn default_refresh_interval() -> Duration {
    parse_default(DEFAULT_REFRESH_INTERVAL)
}

fn default_fetch_timeout() -> Duration {
    parse_default(DEFAULT_FETCH_TIMEOUT)
}

fn default_connect_timeout() -> Duration {
    parse_default(DEFAULT_CONNECT_TIMEOUT)
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            config_path: default_playlist_config_path(),
            refresh_interval: default_refresh_interval(),
            fetch_timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl Config {
    /// Load the TOML configuration, writing a default file when none exists
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let config_file = config_file.as_ref();
        if config_file.exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Self::from_toml_str(&contents)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config).map_err(|e| {
                AppError::configuration(format!("Unable to serialize default config: {e}"))
            })?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file.display());
            Ok(default_config)
        }
    }

    pub fn from_toml_str(contents: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| AppError::configuration(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.playlist.max_concurrent_fetches == 0 {
            return Err(AppError::configuration(
                "playlist.max_concurrent_fetches must be at least 1",
            ));
        }
        if self.playlist.refresh_interval.is_zero() {
            return Err(AppError::configuration(
                "playlist.refresh_interval must be greater than zero",
            ));
        }
        if self.playlist.fetch_timeout.is_zero() {
            return Err(AppError::configuration(
                "playlist.fetch_timeout must be greater than zero",
            ));
        }
        if self.security_file.is_some() && self.security.is_some() {
            return Err(AppError::configuration(
                "Set either security_file or [security], not both",
            ));
        }
        if let Some(auth) = &self.auth {
            if let Some(user) = auth
                .users
                .iter()
                .find(|u| u.username.is_empty() || u.password_hash.is_empty())
            {
                return Err(AppError::configuration(format!(
                    "auth.users entry '{}' needs both username and password_hash",
                    user.username
                )));
            }
        }
        Ok(())
    }

    /// The security document in effect, from the file or the inline table
    pub fn load_security(&self) -> AppResult<Option<SecurityConfig>> {
        match (&self.security_file, &self.security) {
            (Some(path), _) => SecurityConfig::load_from_file(path).map(Some),
            (None, Some(inline)) => Ok(Some(inline.clone())),
            (None, None) => Ok(None),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}
