use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::engine::filter::FilterMode;
use crate::ts3::types::ChannelId;

pub const DEFAULT_QUERY_PORT: u16 = 10011;
pub const DEFAULT_VIRTUAL_SERVER_ID: u32 = 1;
/// 30 minutes.
pub const DEFAULT_IDLE_THRESHOLD_MS: u64 = 1_800_000;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_ERROR_COOLDOWN_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required configuration is missing: '{0}' is not set")]
    Missing(&'static str),

    #[error("Invalid value for '{key}' ({value:?}): {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub afk: AfkConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub address: String,
    #[serde(default = "default_query_port")]
    pub query_port: u16,
    #[serde(default = "default_virtual_server_id")]
    pub virtual_server_id: u32,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AfkConfig {
    pub afk_channel_id: ChannelId,
    #[serde(default)]
    pub channel_ids: Vec<ChannelId>,
    pub mode: FilterMode,
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub error_cooldown_secs: u64,
    pub request_timeout_secs: u64,
}

fn default_query_port() -> u16 {
    DEFAULT_QUERY_PORT
}

fn default_virtual_server_id() -> u32 {
    DEFAULT_VIRTUAL_SERVER_ID
}

fn default_idle_threshold_ms() -> u64 {
    DEFAULT_IDLE_THRESHOLD_MS
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            error_cooldown_secs: DEFAULT_ERROR_COOLDOWN_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.query_port)
    }
}

// Keeps the password out of logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("address", &self.address)
            .field("query_port", &self.query_port)
            .field("virtual_server_id", &self.virtual_server_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Loads a TOML config file with `[server]`, `[afk]` and `[polling]` tables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)?;

        config.server.address = config.server.address.trim().to_string();
        config.server.username = config.server.username.trim().to_string();

        config.validate()?;
        Ok(config)
    }

    /// Reads `path` when given, otherwise the environment.
    pub fn load_or_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from environment-style keys supplied by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let config = Config {
            server: ServerConfig {
                address: required("SERVER_ADDRESS")?,
                query_port: parse_or(get("QUERY_PORT"), "QUERY_PORT", DEFAULT_QUERY_PORT)?,
                virtual_server_id: parse_or(
                    get("VIRTUAL_SERVER_ID"),
                    "VIRTUAL_SERVER_ID",
                    DEFAULT_VIRTUAL_SERVER_ID,
                )?,
                username: required("USERNAME")?,
                password: required("PASSWORD")?,
            },
            afk: AfkConfig {
                afk_channel_id: parse_value(&required("AFK_CHANNEL_ID")?, "AFK_CHANNEL_ID")?,
                channel_ids: parse_channel_set(get("CHANNEL_SET").as_deref().unwrap_or(""))?,
                mode: parse_value(&required("MODE")?, "MODE")?,
                idle_threshold_ms: parse_or(
                    get("IDLE_THRESHOLD_MS"),
                    "IDLE_THRESHOLD_MS",
                    DEFAULT_IDLE_THRESHOLD_MS,
                )?,
            },
            polling: PollingConfig {
                interval_secs: parse_or(
                    get("POLL_INTERVAL_SECS"),
                    "POLL_INTERVAL_SECS",
                    DEFAULT_POLL_INTERVAL_SECS,
                )?,
                error_cooldown_secs: parse_or(
                    get("ERROR_COOLDOWN_SECS"),
                    "ERROR_COOLDOWN_SECS",
                    DEFAULT_ERROR_COOLDOWN_SECS,
                )?,
                request_timeout_secs: parse_or(
                    get("REQUEST_TIMEOUT_SECS"),
                    "REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.is_empty() {
            return Err(ConfigError::Missing("SERVER_ADDRESS"));
        }
        if self.server.username.is_empty() {
            return Err(ConfigError::Missing("USERNAME"));
        }
        if self.server.password.is_empty() {
            return Err(ConfigError::Missing("PASSWORD"));
        }
        if self.afk.afk_channel_id == 0 {
            return Err(invalid("AFK_CHANNEL_ID", "0", "channel id must be non-zero"));
        }
        if self.polling.interval_secs == 0 {
            return Err(invalid("POLL_INTERVAL_SECS", "0", "interval must be non-zero"));
        }
        if self.polling.request_timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", "0", "timeout must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_value<T>(raw: &str, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| invalid(key, raw, e.to_string()))
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => parse_value(&raw, key),
        None => Ok(default),
    }
}

/// Parses a comma-separated list of channel ids. Blank entries are skipped.
pub fn parse_channel_set(raw: &str) -> Result<Vec<ChannelId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_value(part, "CHANNEL_SET"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn minimal() -> HashMap<String, String> {
        env(&[
            ("SERVER_ADDRESS", "ts.example.org"),
            ("USERNAME", "serveradmin"),
            ("PASSWORD", "secret"),
            ("AFK_CHANNEL_ID", "2"),
            ("MODE", "deny-list"),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_applied() {
        let config = load(&minimal()).unwrap();
        assert_eq!(config.server.query_port, 10011);
        assert_eq!(config.server.virtual_server_id, 1);
        assert_eq!(config.afk.idle_threshold_ms, 1_800_000);
        assert!(config.afk.channel_ids.is_empty());
        assert_eq!(config.afk.mode, FilterMode::DenyList);
        assert_eq!(config.polling.interval(), Duration::from_secs(60));
        assert_eq!(config.polling.error_cooldown(), Duration::from_secs(10));
        assert_eq!(config.server.socket_addr(), "ts.example.org:10011");
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = minimal();
        vars.insert("QUERY_PORT".into(), "10022".into());
        vars.insert("VIRTUAL_SERVER_ID".into(), "3".into());
        vars.insert("CHANNEL_SET".into(), " 3, 4 ,5,".into());
        vars.insert("MODE".into(), "allow-list".into());
        vars.insert("IDLE_THRESHOLD_MS".into(), "60000".into());

        let config = load(&vars).unwrap();
        assert_eq!(config.server.query_port, 10022);
        assert_eq!(config.server.virtual_server_id, 3);
        assert_eq!(config.afk.channel_ids, vec![3, 4, 5]);
        assert_eq!(config.afk.mode, FilterMode::AllowList);
        assert_eq!(config.afk.idle_threshold_ms, 60_000);
    }

    #[test]
    fn missing_required_key() {
        let mut vars = minimal();
        vars.remove("PASSWORD");
        assert!(matches!(load(&vars), Err(ConfigError::Missing("PASSWORD"))));

        let mut vars = minimal();
        vars.insert("USERNAME".into(), "   ".into());
        assert!(matches!(load(&vars), Err(ConfigError::Missing("USERNAME"))));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut vars = minimal();
        vars.insert("MODE".into(), "blacklist".into());
        match load(&vars) {
            Err(ConfigError::Invalid { key, value, .. }) => {
                assert_eq!(key, "MODE");
                assert_eq!(value, "blacklist");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut vars = minimal();
        vars.insert("QUERY_PORT".into(), "70000".into());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { key: "QUERY_PORT", .. })));

        let mut vars = minimal();
        vars.insert("CHANNEL_SET".into(), "3,four".into());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { key: "CHANNEL_SET", .. })));
    }

    #[test]
    fn zero_afk_channel_is_rejected() {
        let mut vars = minimal();
        vars.insert("AFK_CHANNEL_ID".into(), "0".into());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { key: "AFK_CHANNEL_ID", .. })));
    }

    #[test]
    fn toml_file_is_loaded() {
        let path = std::env::temp_dir().join(format!("ts3_afkbot_config_{}.toml", std::process::id()));
        fs::write(
            &path,
            r#"
[server]
address = "127.0.0.1"
username = "serveradmin"
password = "secret"

[afk]
afk_channel_id = 2
channel_ids = [3, 4]
mode = "allow-list"

[polling]
interval_secs = 30
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.server.query_port, 10011);
        assert_eq!(config.afk.channel_ids, vec![3, 4]);
        assert_eq!(config.afk.mode, FilterMode::AllowList);
        assert_eq!(config.afk.idle_threshold_ms, 1_800_000);
        assert_eq!(config.polling.interval_secs, 30);
        assert_eq!(config.polling.error_cooldown_secs, 10);
    }

    #[test]
    fn debug_output_hides_password() {
        let config = load(&minimal()).unwrap();
        let rendered = format!("{:?}", config.server);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
