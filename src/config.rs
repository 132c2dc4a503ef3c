//! Configuration for the listener and connector programs.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::buffer::DEFAULT_MAX_MESSAGE_LEN;
use crate::endpoint::Endpoint;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Which side of the exchange a program plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Listener,
    Connector,
}

impl Role {
    /// Message sent when none is configured.
    pub fn default_message(self) -> &'static str {
        match self {
            Role::Listener => "Hello from server",
            Role::Connector => "Hello from client",
        }
    }
}

/// Command-line arguments shared by both programs
#[derive(Parser, Debug)]
#[command(version, about = "Single-shot TCP message exchange", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Endpoint to bind or connect to (e.g., 127.0.0.1:5984)
    #[arg(short, long)]
    pub address: Option<String>,

    /// Pending-connection queue depth (listener only)
    #[arg(short, long)]
    pub backlog: Option<u32>,

    /// Message to send instead of the built-in greeting
    #[arg(short, long)]
    pub message: Option<String>,

    /// Maximum number of bytes to read from the peer
    #[arg(long)]
    pub max_message_len: Option<usize>,

    /// Allow other sockets to bind the same port (listener only)
    #[arg(long)]
    pub reuse_port: bool,

    /// Connect timeout in milliseconds (0 = wait indefinitely)
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Read/write timeout in milliseconds (0 = wait indefinitely)
    #[arg(long)]
    pub io_timeout_ms: Option<u64>,

    /// Skip the "press Enter" confirmation
    #[arg(short = 'y', long)]
    pub no_confirm: bool,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

/// Listener-side settings
#[derive(Debug, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    #[serde(default = "default_true")]
    pub reuse_address: bool,
    #[serde(default)]
    pub reuse_port: bool,
    pub message: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            backlog: default_backlog(),
            reuse_address: true,
            reuse_port: false,
            message: None,
        }
    }
}

/// Connector-side settings
#[derive(Debug, Deserialize, Default)]
pub struct ConnectorConfig {
    /// Connect timeout in milliseconds, 0 = none
    #[serde(default)]
    pub connect_timeout_ms: u64,
    pub message: Option<String>,
}

/// Settings that apply to the exchange on either side
#[derive(Debug, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Read/write timeout in milliseconds, 0 = none
    #[serde(default)]
    pub io_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub confirm: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
            io_timeout_ms: 0,
            confirm: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_address() -> String {
    Endpoint::default().to_string()
}

fn default_backlog() -> u32 {
    3
}

fn default_max_message_len() -> usize {
    DEFAULT_MAX_MESSAGE_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub endpoint: Endpoint,
    pub backlog: u32,
    pub reuse_address: bool,
    pub reuse_port: bool,
    pub message: String,
    pub max_message_len: usize,
    pub connect_timeout: Option<Duration>,
    pub io_timeout: Option<Duration>,
    pub confirm: bool,
    pub log_level: String,
}

impl Config {
    /// Defaults for `role`: loopback:5984, backlog 3, built-in greeting.
    pub fn new(role: Role) -> Self {
        let toml = TomlConfig::default();
        Config {
            role,
            endpoint: Endpoint::default(),
            backlog: toml.listener.backlog,
            reuse_address: toml.listener.reuse_address,
            reuse_port: toml.listener.reuse_port,
            message: role.default_message().to_string(),
            max_message_len: toml.exchange.max_message_len,
            connect_timeout: None,
            io_timeout: None,
            confirm: toml.exchange.confirm,
            log_level: toml.logging.level,
        }
    }

    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load(role: Role) -> Result<Self, ConfigError> {
        Self::from_cli(role, CliArgs::parse())
    }

    /// Resolve already-parsed CLI args, reading the TOML file they name.
    pub fn from_cli(role: Role, cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(role, cli, toml_config)
    }

    /// Merge CLI args over TOML values and validate the result.
    pub fn merge(role: Role, cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let address = cli.address.unwrap_or(toml_config.endpoint.address);
        let endpoint = Endpoint::parse(&address)
            .map_err(|e| ConfigError::Invalid(format!("address: {e}")))?;

        let role_message = match role {
            Role::Listener => toml_config.listener.message,
            Role::Connector => toml_config.connector.message,
        };

        let config = Config {
            role,
            endpoint,
            backlog: cli.backlog.unwrap_or(toml_config.listener.backlog),
            reuse_address: toml_config.listener.reuse_address,
            reuse_port: cli.reuse_port || toml_config.listener.reuse_port,
            message: cli
                .message
                .or(role_message)
                .unwrap_or_else(|| role.default_message().to_string()),
            max_message_len: cli
                .max_message_len
                .unwrap_or(toml_config.exchange.max_message_len),
            connect_timeout: millis(
                cli.connect_timeout_ms
                    .unwrap_or(toml_config.connector.connect_timeout_ms),
            ),
            io_timeout: millis(cli.io_timeout_ms.unwrap_or(toml_config.exchange.io_timeout_ms)),
            confirm: !cli.no_confirm && toml_config.exchange.confirm,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backlog == 0 {
            return Err(ConfigError::Invalid("backlog must be at least 1".into()));
        }
        if i32::try_from(self.backlog).is_err() {
            return Err(ConfigError::Invalid(format!(
                "backlog {} is too large",
                self.backlog
            )));
        }
        if self.max_message_len == 0 {
            return Err(ConfigError::Invalid(
                "max_message_len must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Zero means "no timeout".
fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("test").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.endpoint.address, "127.0.0.1:5984");
        assert_eq!(config.listener.backlog, 3);
        assert!(config.listener.reuse_address);
        assert!(!config.listener.reuse_port);
        assert_eq!(config.exchange.max_message_len, 1024);
        assert!(config.exchange.confirm);
    }

    #[test]
    fn test_role_defaults() {
        let listener = Config::new(Role::Listener);
        assert_eq!(listener.message, "Hello from server");
        assert_eq!(listener.endpoint, Endpoint::default());
        assert!(listener.connect_timeout.is_none());

        let connector = Config::merge(Role::Connector, cli(&[]), TomlConfig::default()).unwrap();
        assert_eq!(connector.message, "Hello from client");
        assert_eq!(connector.backlog, 3);
        assert!(connector.confirm);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [endpoint]
            address = "0.0.0.0:7000"

            [listener]
            backlog = 8
            reuse_port = true
            message = "pong"

            [connector]
            connect_timeout_ms = 250
            message = "ping"

            [exchange]
            max_message_len = 64
            io_timeout_ms = 1000
            confirm = false

            [logging]
            level = "debug"
        "#;

        let toml_config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(toml_config.listener.backlog, 8);
        assert_eq!(toml_config.logging.level, "debug");

        let config = Config::merge(Role::Connector, cli(&[]), toml_config).unwrap();
        assert_eq!(config.endpoint.port(), 7000);
        assert_eq!(config.message, "ping");
        assert!(config.reuse_port);
        assert_eq!(config.max_message_len, 64);
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.io_timeout, Some(Duration::from_secs(1)));
        assert!(!config.confirm);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [endpoint]
            address = "127.0.0.1:7000"
            [listener]
            backlog = 8
            message = "from file"
            "#,
        )
        .unwrap();

        let args = cli(&[
            "--address",
            "127.0.0.1:9000",
            "--backlog",
            "1",
            "--message",
            "from cli",
            "--no-confirm",
            "--log-level",
            "trace",
        ]);
        let config = Config::merge(Role::Listener, args, toml_config).unwrap();
        assert_eq!(config.endpoint.port(), 9000);
        assert_eq!(config.backlog, 1);
        assert_eq!(config.message, "from cli");
        assert!(!config.confirm);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_cli_log_level_overrides_toml() {
        let from_file = || toml::from_str::<TomlConfig>("[logging]\nlevel = \"debug\"").unwrap();

        let config = Config::merge(Role::Listener, cli(&["--log-level", "info"]), from_file()).unwrap();
        assert_eq!(config.log_level, "info");

        let config = Config::merge(Role::Listener, cli(&[]), from_file()).unwrap();
        assert_eq!(config.log_level, "debug");

        let config = Config::merge(Role::Listener, cli(&[]), TomlConfig::default()).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validation() {
        let err = Config::merge(Role::Listener, cli(&["-b", "0"]), TomlConfig::default());
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = Config::merge(
            Role::Listener,
            cli(&["--max-message-len", "0"]),
            TomlConfig::default(),
        );
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = Config::merge(Role::Connector, cli(&["-a", "nowhere"]), TomlConfig::default());
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[exchange]\nmax_message_len = 32").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::from_cli(Role::Listener, cli(&["--config", &path])).unwrap();
        assert_eq!(config.max_message_len, 32);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::from_cli(Role::Listener, cli(&["-c", "/nonexistent/handshake.toml"]));
        assert!(matches!(err, Err(ConfigError::FileRead(..))));
    }

    #[test]
    fn test_load_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbacklog = \"three\"").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let err = Config::from_cli(Role::Listener, cli(&["-c", &path]));
        assert!(matches!(err, Err(ConfigError::TomlParse(..))));
    }
}
