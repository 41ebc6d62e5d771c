//! Bot configuration loaded from TOML.
//!
//! ```toml
//! channels = ["#rust"]
//!
//! [identity]
//! nicknames = ["slirc", "slirc_"]
//! username = "slirc"
//! realname = "slirc bot"
//!
//! [server]
//! addresses = ["irc.libera.chat:6667", "irc.eu.libera.chat"]
//!
//! [commands]
//! prefixes = ["!"]
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::connection::ConnectionSettings;
use crate::rotation::RotationList;
use crate::transport::ServerAddress;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub identity: IdentityConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Channels joined after every successful registration.
    #[serde(default)]
    pub channels: Vec<String>,
    /// CTCP VERSION reply.
    #[serde(default = "default_version")]
    pub version: String,
    /// Stream encoding label; anything but UTF-8 needs the `encoding` feature.
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Tried in order when a nickname is taken.
    pub nicknames: Vec<String>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_realname")]
    pub realname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// `host` or `host:port`, tried in order on failure.
    pub addresses: Vec<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            reconnect_delay_secs: default_reconnect_delay(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefixes: default_prefixes(),
        }
    }
}

fn default_version() -> String {
    concat!("slirc-bot ", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_username() -> String {
    "slirc".to_string()
}

fn default_realname() -> String {
    "slirc-bot".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_reconnect_delay() -> u64 {
    15
}

fn default_poll_interval() -> u64 {
    50
}

fn default_prefixes() -> Vec<String> {
    vec!["!".to_string()]
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Check what deserialization cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.nicknames.iter().all(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid("identity.nicknames must not be empty".into()));
        }
        if self.identity.nicknames.iter().any(|n| n.contains(' ')) {
            return Err(ConfigError::Invalid("nicknames cannot contain spaces".into()));
        }
        if self.commands.prefixes.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid("command prefixes cannot be empty".into()));
        }
        self.server_addresses()?;
        Ok(())
    }

    pub fn server_addresses(&self) -> Result<Vec<ServerAddress>, ConfigError> {
        if self.server.addresses.is_empty() {
            return Err(ConfigError::Invalid("server.addresses must not be empty".into()));
        }
        self.server
            .addresses
            .iter()
            .map(|a| a.parse().map_err(ConfigError::Invalid))
            .collect()
    }

    pub fn servers(&self) -> Result<RotationList<ServerAddress>, ConfigError> {
        RotationList::new(self.server_addresses()?).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn nicknames(&self) -> Result<RotationList<String>, ConfigError> {
        let nicks = self
            .identity
            .nicknames
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        RotationList::new(nicks).map_err(|_| ConfigError::Invalid("identity.nicknames must not be empty".into()))
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            username: self.identity.username.clone(),
            realname: self.identity.realname.clone(),
            password: self.server.password.clone(),
            encoding: self.encoding.clone(),
            connect_timeout: Duration::from_secs(self.connection.connect_timeout_secs),
            reconnect_delay: Duration::from_secs(self.connection.reconnect_delay_secs),
            poll_interval: Duration::from_millis(self.connection.poll_interval_ms.max(1)),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
