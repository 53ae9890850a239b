//! Configuration module for the bufdev server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the device server
#[derive(Parser, Debug)]
#[command(name = "bufdev")]
#[command(author = "bufdev authors")]
#[command(version = "0.1.0")]
#[command(about = "A shared byte device served over a Unix socket", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path of the Unix socket to listen on
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Device capacity in bytes
    #[arg(short = 'b', long)]
    pub capacity: Option<usize>,

    /// Print diagnostic lines (connections, raw commands)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Unix socket path
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// File mode applied to the socket after binding
    #[serde(default = "default_socket_mode")]
    pub socket_mode: u32,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            socket_mode: default_socket_mode(),
            backlog: default_backlog(),
        }
    }
}

/// Device-related configuration
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    /// Buffer capacity in bytes
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
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

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/example_resmgr.sock")
}

fn default_socket_mode() -> u32 {
    0o666 // world read/write
}

fn default_backlog() -> i32 {
    8
}

fn default_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub socket_path: PathBuf,
    pub socket_mode: u32,
    pub backlog: i32,
    pub capacity: usize,
    pub verbose: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Merge parsed CLI args over the TOML file they name, if any.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let verbose = cli.verbose > 0;
        let log_level = if cli.log_level != "info" {
            cli.log_level
        } else {
            toml_config.logging.level
        };

        let config = Config {
            socket_path: cli.socket.unwrap_or(toml_config.server.socket_path),
            socket_mode: toml_config.server.socket_mode,
            backlog: toml_config.server.backlog,
            capacity: cli.capacity.unwrap_or(toml_config.device.capacity),
            verbose,
            log_level: if verbose && !matches!(log_level.as_str(), "debug" | "trace") {
                "debug".to_string()
            } else {
                log_level
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid(
                "capacity must leave room for a terminator byte".to_string(),
            ));
        }
        if self.backlog <= 0 {
            return Err(ConfigError::Invalid("backlog must be positive".to_string()));
        }
        if self.socket_mode > 0o777 {
            return Err(ConfigError::Invalid(format!(
                "socket_mode {:o} is not a permission mode",
                self.socket_mode
            )));
        }
        Ok(())
    }
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
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("bufdev").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(
            config.server.socket_path,
            PathBuf::from("/tmp/example_resmgr.sock")
        );
        assert_eq!(config.server.socket_mode, 0o666);
        assert_eq!(config.server.backlog, 8);
        assert_eq!(config.device.capacity, 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            socket_path = "/run/bufdev.sock"
            socket_mode = 384
            backlog = 32

            [device]
            capacity = 4096

            [logging]
            level = "warn"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.socket_path, PathBuf::from("/run/bufdev.sock"));
        assert_eq!(config.server.socket_mode, 0o600);
        assert_eq!(config.server.backlog, 32);
        assert_eq!(config.device.capacity, 4096);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("[device]\ncapacity = 16\n").unwrap();
        assert_eq!(config.device.capacity, 16);
        assert_eq!(config.server.backlog, 8);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_cli_defaults() {
        let config = Config::from_cli(cli(&[])).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/example_resmgr.sock"));
        assert_eq!(config.capacity, 1024);
        assert!(!config.verbose);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_cli_overrides() {
        let config =
            Config::from_cli(cli(&["-s", "/tmp/other.sock", "-b", "64", "--log-level", "trace"]))
                .unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/other.sock"));
        assert_eq!(config.capacity, 64);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_verbose_raises_log_level() {
        let config = Config::from_cli(cli(&["-v"])).unwrap();
        assert!(config.verbose);
        assert_eq!(config.log_level, "debug");

        let config = Config::from_cli(cli(&["-v", "--log-level", "trace"])).unwrap();
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Config::from_cli(cli(&["-b", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_cli(cli(&["-c", "/nonexistent/bufdev.toml"])).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(..)));
    }
}
