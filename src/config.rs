//! TOML configuration.
//!
//! Loaded once at startup from the path given by `--config`. See
//! `config/xiview.example.toml` for a complete file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound on bound parameters in one batched statement.
    #[serde(default = "default_max_bind_params")]
    pub max_bind_params: usize,
}

fn default_max_connections() -> u32 {
    5
}
fn default_max_bind_params() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.max_connections == 0 {
        anyhow::bail!("db.max_connections must be >= 1");
    }

    if config.db.max_bind_params < xiview_data_core::compose::MIN_BIND_BUDGET {
        anyhow::bail!(
            "db.max_bind_params must be >= {}",
            xiview_data_core::compose::MIN_BIND_BUDGET
        );
    }

    if config.server.request_timeout_secs == Some(0) {
        anyhow::bail!("server.request_timeout_secs must be > 0 when set");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
[db]
path = "/tmp/x.sqlite"

[server]
bind = "127.0.0.1:8080"
"#,
        )
        .unwrap();
        assert_eq!(config.db.max_connections, 5);
        assert_eq!(config.db.max_bind_params, 10_000);
        assert_eq!(config.server.request_timeout_secs, None);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_rejects_tiny_bind_budget() {
        let err = parse(
            r#"
[db]
path = "/tmp/x.sqlite"
max_bind_params = 1

[server]
bind = "127.0.0.1:8080"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_bind_params"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = parse(
            r#"
[db]
path = "/tmp/x.sqlite"

[server]
bind = "127.0.0.1:8080"
request_timeout_secs = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn test_missing_server_section_fails() {
        assert!(parse("[db]\npath = \"/tmp/x.sqlite\"\n").is_err());
    }
}
