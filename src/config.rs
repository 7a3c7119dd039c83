use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use crate::cli::Cli;
use crate::error::ConfigError;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// File whose content is pushed to clients
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,

    /// Loading page markup, served for every unknown path
    #[serde(default = "default_html_file")]
    pub html_file: PathBuf,

    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Minimum delay between two readiness probes
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Where the target application answers once it is up
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Body markers that identify the target application
    #[serde(default = "default_probe_app_markers")]
    pub probe_app_markers: Vec<String>,

    /// Body marker that identifies our own loading page
    #[serde(default = "default_probe_loading_marker")]
    pub probe_loading_marker: String,

    /// Path clients are sent to once the target is ready
    #[serde(default = "default_redirect_target")]
    pub redirect_target: String,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Apply command line overrides on top of the loaded values
    pub fn apply_cli(mut self, cli: Cli) -> Result<Self, ConfigError> {
        if let Some(addr) = cli.addr {
            let (host, port) = parse_addr(&addr)?;
            self.host = host;
            self.port = port;
        }
        if let Some(path) = cli.status_file {
            self.status_file = path;
        }
        if let Some(path) = cli.html_file {
            self.html_file = path;
        }
        if let Some(interval) = cli.check_interval {
            self.check_interval_ms = interval.as_millis() as u64;
        }
        if let Some(url) = cli.probe_url {
            self.probe_url = url;
        }
        Ok(self)
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            status_file: default_status_file(),
            html_file: default_html_file(),
            check_interval_ms: default_check_interval_ms(),
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_url: default_probe_url(),
            probe_app_markers: default_probe_app_markers(),
            probe_loading_marker: default_probe_loading_marker(),
            redirect_target: default_redirect_target(),
        }
    }
}

/// Split `host:port` or `:port` into its parts. An empty host binds every interface.
fn parse_addr(addr: &str) -> Result<(String, u16), ConfigError> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::InvalidAddress(addr.to_string()))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidAddress(addr.to_string()))?;
    let host = if host.is_empty() { default_host() } else { host.to_string() };
    Ok((host, port))
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_status_file() -> PathBuf {
    PathBuf::from("/home/coder/loading/loading-status.txt")
}

fn default_html_file() -> PathBuf {
    PathBuf::from("/home/coder/loading/loading.html")
}

fn default_check_interval_ms() -> u64 {
    1000
}

fn default_probe_interval_ms() -> u64 {
    5000
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_probe_url() -> String {
    "http://localhost:8080/".to_string()
}

fn default_probe_app_markers() -> Vec<String> {
    vec!["code-server".to_string(), "vscode".to_string()]
}

fn default_probe_loading_marker() -> String {
    "Loading status".to_string()
}

fn default_redirect_target() -> String {
    "/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_loading_container_layout() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.check_interval(), Duration::from_secs(1));
        assert_eq!(config.probe_interval(), Duration::from_secs(5));
        assert_eq!(config.redirect_target, "/");
    }

    #[test]
    fn parse_addr_accepts_bare_port() {
        assert_eq!(parse_addr(":9000").unwrap(), ("0.0.0.0".to_string(), 9000));
        assert_eq!(
            parse_addr("127.0.0.1:3000").unwrap(),
            ("127.0.0.1".to_string(), 3000)
        );
    }

    #[test]
    fn parse_addr_rejects_garbage() {
        assert!(matches!(parse_addr("8080"), Err(ConfigError::InvalidAddress(_))));
        assert!(matches!(parse_addr("host:http"), Err(ConfigError::InvalidAddress(_))));
    }

    #[test]
    fn cli_overrides_environment_values() {
        let cli = Cli {
            addr: Some("127.0.0.1:4000".to_string()),
            check_interval: Some(Duration::from_millis(200)),
            ..Cli::default()
        };
        let config = Config::default().apply_cli(cli).unwrap();
        assert_eq!(config.server_address(), "127.0.0.1:4000");
        assert_eq!(config.check_interval(), Duration::from_millis(200));
        assert_eq!(config.html_file, default_html_file());
    }
}
