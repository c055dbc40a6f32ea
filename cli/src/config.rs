//! Configuration management

use isidash_core::{Error, ExecutorConfig, MailSettings, Result, SshSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory dashboards are written to
    pub output_dir: PathBuf,

    pub ssh: SshSettings,

    pub executor: ExecutorConfig,

    pub mail: MailSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            ssh: SshSettings::default(),
            executor: ExecutorConfig::default(),
            mail: MailSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            Self::load_from_file(p)
        } else {
            Self::load_from_env()
        }
    }

    /// Load from configuration file
    fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    fn load_from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(dir) = lookup("ISIDASH_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("ISIDASH_SSH_PORT") {
            config.ssh.port = parse_port("ISIDASH_SSH_PORT", &port)?;
        }
        if let Some(relay) = lookup("ISIDASH_MAIL_RELAY") {
            config.mail.relay = relay;
        }
        if let Some(port) = lookup("ISIDASH_MAIL_PORT") {
            config.mail.port = parse_port("ISIDASH_MAIL_PORT", &port)?;
        }
        if let Some(from) = lookup("ISIDASH_MAIL_FROM") {
            config.mail.from = from;
        }
        if let Some(to) = lookup("ISIDASH_MAIL_TO") {
            config.mail.to = to;
        }
        config.mail.cc = lookup("ISIDASH_MAIL_CC").filter(|cc| !cc.trim().is_empty());

        Ok(config)
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid port in {}: {}", var, value)))
}
