//! Configuration management for hostpulse.
//!
//! Handles loading, merging, and validating configuration from a file and
//! CLI arguments. Supports YAML, JSON, and TOML formats selected by file
//! extension; CLI flags override file values which override defaults.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9482;
pub const DEFAULT_INTERVAL_SECONDS: u64 = 2;
pub const DEFAULT_COLLECT_TIMEOUT_MS: u64 = 1000;

/// Effective configuration after merging file and CLI sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Collection
    /// Seconds between collection cycles (default: 2, minimum: 1)
    #[serde(alias = "interval-seconds")]
    pub interval_seconds: Option<u64>,
    /// Per-collector deadline in milliseconds (default: 1000)
    #[serde(alias = "collect-timeout-ms")]
    pub collect_timeout_ms: Option<u64>,

    // Logging
    pub log_level: Option<String>,
}

impl Config {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn effective_bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn effective_interval_seconds(&self) -> u64 {
        self.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECONDS)
    }

    pub fn effective_collect_timeout_ms(&self) -> u64 {
        self.collect_timeout_ms.unwrap_or(DEFAULT_COLLECT_TIMEOUT_MS)
    }
}

/// Loads a config file, dispatching on its extension.
fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let config = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?,
        other => bail!(
            "Unsupported config format '{}' for {} (expected yaml, json, or toml)",
            other,
            path.display()
        ),
    };

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolves the effective configuration (CLI > file > defaults).
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else if let Some(path) = &args.config {
        load_config_file(path)?
    } else {
        Config::default()
    };

    // CLI flags win over file values
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(bind) = args.bind {
        config.bind = Some(bind.to_string());
    }
    if let Some(interval) = args.interval_seconds {
        config.interval_seconds = Some(interval);
    }
    if let Some(timeout) = args.collect_timeout_ms {
        config.collect_timeout_ms = Some(timeout);
    }

    Ok(config)
}

/// Validates the effective config before startup.
pub fn validate_effective_config(config: &Config) -> Result<()> {
    if config.effective_port() == 0 {
        bail!("port must be non-zero");
    }

    if config.effective_interval_seconds() < 1 {
        bail!("interval_seconds must be at least 1 (sub-second collection is not supported)");
    }

    if config.effective_collect_timeout_ms() < 100 {
        bail!("collect_timeout_ms must be at least 100");
    }

    // A deadline longer than the cycle would let guarded stragglers from
    // one cycle overlap the next.
    if config.effective_collect_timeout_ms() > config.effective_interval_seconds() * 1000 {
        bail!("collect_timeout_ms must not exceed the collection interval");
    }

    if let Some(bind) = &config.bind {
        bind.parse::<std::net::IpAddr>()
            .with_context(|| format!("invalid bind address '{}'", bind))?;
    }

    Ok(())
}

/// Prints the effective merged config in the requested format.
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    let rendered = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string(config)?,
    };
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(ext: &str, content: &str) -> tempfile::TempPath {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{}", ext))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.into_temp_path()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_port(), DEFAULT_PORT);
        assert_eq!(config.effective_bind(), DEFAULT_BIND_ADDR);
        assert_eq!(config.effective_interval_seconds(), DEFAULT_INTERVAL_SECONDS);
        assert_eq!(
            config.effective_collect_timeout_ms(),
            DEFAULT_COLLECT_TIMEOUT_MS
        );
        assert!(validate_effective_config(&config).is_ok());
    }

    #[test]
    fn test_load_yaml_config() {
        let path = write_temp("yaml", "port: 9999\ninterval-seconds: 5\n");
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.effective_port(), 9999);
        assert_eq!(config.effective_interval_seconds(), 5);
    }

    #[test]
    fn test_load_json_config() {
        let path = write_temp("json", "{\"port\": 8080, \"bind\": \"127.0.0.1\"}");
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.effective_port(), 8080);
        assert_eq!(config.effective_bind(), "127.0.0.1");
    }

    #[test]
    fn test_load_toml_config() {
        let path = write_temp("toml", "port = 7070\ncollect_timeout_ms = 500\n");
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.effective_port(), 7070);
        assert_eq!(config.effective_collect_timeout_ms(), 500);
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let path = write_temp("ini", "port=1\n");
        assert!(load_config_file(&path).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.interval_seconds = Some(0);
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.collect_timeout_ms = Some(10);
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.interval_seconds = Some(1);
        config.collect_timeout_ms = Some(5000);
        assert!(
            validate_effective_config(&config).is_err(),
            "deadline longer than the cycle must be rejected"
        );

        let mut config = Config::default();
        config.bind = Some("not-an-ip".to_string());
        assert!(validate_effective_config(&config).is_err());
    }
}
