//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Command-line flags** — `--url`
//! 2. **Environment variables** — `XBMCMD_URL`, `XBMCMD_USERNAME`,
//!    `XBMCMD_PASSWORD` (and `RUST_LOG` for the log filter)
//! 3. **Config file** — path via `--config <path>`, or `xbmcmd.toml` in CWD
//! 4. **Compiled defaults** — `http://localhost:8080/jsonrpc`, log level `error`
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! host = "localhost"
//! port = 8080
//! path = "/jsonrpc"
//! # url = "http://htpc.lan:8080/jsonrpc"   # overrides host/port/path
//! # username = "kodi"
//! # password = "secret"
//! # timeout_secs = 30
//!
//! [logging]
//! level = "error"
//!
//! [shell]
//! prompt = "XBMC> "
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::client::Credentials;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "xbmcmd.toml";

/// CLI arguments parsed by `clap`.
#[derive(Debug, Parser)]
#[command(
    name = "xbmcmd",
    version,
    about = "Command-line remote for an XBMC/Kodi media center"
)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint, e.g. http://htpc:8080/jsonrpc
    #[arg(long)]
    pub url: Option<String>,

    /// Run a single command and exit instead of starting the shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// The one-shot command line, if any words were given.
    pub fn one_shot(&self) -> Option<String> {
        if self.command.is_empty() {
            None
        } else {
            Some(self.command.join(" "))
        }
    }
}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub shell: ShellConfig,
}

/// Where the media server lives and how to reach it.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name (default `localhost`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Web server port (default 8080).
    #[serde(default = "default_port")]
    pub port: u16,
    /// JSON-RPC path (default `/jsonrpc`).
    #[serde(default = "default_path")]
    pub path: String,
    /// Full endpoint URL; takes precedence over host/port/path.
    pub url: Option<String>,
    /// HTTP basic-auth user. Override with `XBMCMD_USERNAME`.
    pub username: Option<String>,
    /// HTTP basic-auth password. Override with `XBMCMD_PASSWORD`.
    pub password: Option<String>,
    /// Per-request timeout in seconds. Unset leaves reqwest's default.
    pub timeout_secs: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter (default `error`). Overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Interactive shell settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_path() -> String {
    "/jsonrpc".to_string()
}
fn default_log_level() -> String {
    "error".to_string()
}
fn default_prompt() -> String {
    "XBMC> ".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            url: None,
            username: None,
            password: None,
            timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
        }
    }
}

impl Config {
    /// Load configuration with the full precedence chain.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        if let Some(url) = &cli.url {
            config.server.url = Some(url.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment overrides, reading variables through `var`.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("XBMCMD_URL") {
            self.server.url = Some(url);
        }
        if let Some(user) = var("XBMCMD_USERNAME") {
            self.server.username = Some(user);
        }
        if let Some(password) = var("XBMCMD_PASSWORD") {
            self.server.password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "server.url must start with http:// or https://, got {url:?}"
                )));
            }
        } else {
            if self.server.host.trim().is_empty() {
                return Err(ConfigError::Invalid("server.host is empty".into()));
            }
            if self.server.port == 0 {
                return Err(ConfigError::Invalid("server.port must be non-zero".into()));
            }
        }
        Ok(())
    }

    /// The effective JSON-RPC endpoint URL.
    pub fn endpoint(&self) -> String {
        if let Some(url) = &self.server.url {
            return url.clone();
        }
        let path = &self.server.path;
        let sep = if path.starts_with('/') { "" } else { "/" };
        format!("http://{}:{}{sep}{path}", self.server.host, self.server.port)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.server.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: self.server.password.clone(),
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.server.timeout_secs.map(Duration::from_secs)
    }
}

/// Reasons configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{0}")]
    Invalid(String),
}
