//! Configuration module for bmc-actor
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/bmc-actor/actor.toml)
//! - User configuration (~/.bmc-actor.toml)
//! - Project configuration (./actor.toml)
//! - Environment variables
//! - Command-line arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::driver::Credentials;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "BMC_ACTOR_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Management controller credentials
    pub bmc: BmcConfig,

    /// IPMI fallback settings
    pub ipmi: IpmiConfig,

    /// Local screenshot storage
    pub screenshot: ScreenshotConfig,

    /// S3 screenshot storage
    pub s3: S3Config,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, `host:port`
    pub bind_to: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_to: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Credentials used for every controller
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BmcConfig {
    /// Login name
    pub username: String,

    /// Password
    pub password: String,
}

impl BmcConfig {
    /// Driver credentials from this section.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

impl fmt::Debug for BmcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BmcConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// IPMI fallback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpmiConfig {
    /// Path to `ipmitool`; searched for when unset
    pub binary: Option<PathBuf>,

    /// `-I` interface argument
    pub interface: String,
}

impl Default for IpmiConfig {
    fn default() -> Self {
        Self {
            binary: None,
            interface: "lanplus".to_string(),
        }
    }
}

/// Local screenshot storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Directory screenshots are written to
    pub storage: PathBuf,

    /// URL path the directory is served under
    pub url_prefix: String,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            storage: PathBuf::from("/tmp/screenshots"),
            url_prefix: "/screenshot".to_string(),
        }
    }
}

/// S3 screenshot storage
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Upload to S3 instead of the local directory
    pub enabled: bool,

    /// Bucket name
    pub bucket: String,

    /// Key prefix inside the bucket
    pub folder: String,

    /// Endpoint URL
    pub endpoint: String,

    /// Region
    pub region: String,

    /// Access key
    pub access_key_id: String,

    /// Secret key
    pub secret_access_key: String,

    /// Canned ACL applied to uploads
    pub acl: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            folder: String::new(),
            endpoint: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            acl: String::new(),
        }
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("enabled", &self.enabled)
            .field("bucket", &self.bucket)
            .field("folder", &self.folder)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("acl", &self.acl)
            .finish()
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `bmc_actor=debug`
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-line
    #[default]
    Pretty,
    /// Single line per event
    Compact,
    /// JSON per event
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl Config {
    /// Load configuration from the standard locations, later files
    /// overriding earlier ones key by key, then apply environment overrides.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        let mut merged = Value::Object(Default::default());

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                merge_values(&mut merged, Self::read_file(&path)?);
            }
        }

        let mut config: Config = serde_json::from_value(merged)
            .context("Configuration does not match the expected layout")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest precedence
    /// first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path replaces the search
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }
        if let Ok(env_config) = std::env::var(CONFIG_ENV) {
            return vec![PathBuf::from(env_config)];
        }

        let mut paths = vec![PathBuf::from("/etc/bmc-actor/actor.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".bmc-actor.toml"));
        }
        paths.push(PathBuf::from("actor.toml"));
        paths
    }

    /// Parse one configuration file into a generic tree
    fn read_file(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let value = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => {
                let table: toml::Value = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
                serde_json::to_value(table)?
            }
            // Unknown extension: try TOML first, then YAML
            _ => match toml::from_str::<toml::Value>(&content) {
                Ok(table) => serde_json::to_value(table)?,
                Err(_) => serde_yaml::from_str(&content).with_context(|| {
                    format!("Failed to parse config file: {}", path.display())
                })?,
            },
        };
        Ok(value)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("BMC_ACTOR_BIND_TO") {
            self.server.bind_to = bind;
        }

        if let Ok(user) = std::env::var("BMC_ACTOR_BMC_USER") {
            self.bmc.username = user;
        }

        if let Ok(pass) = std::env::var("BMC_ACTOR_BMC_PASS") {
            self.bmc.password = pass;
        }

        if let Ok(dir) = std::env::var("BMC_ACTOR_SCREENSHOT_STORAGE") {
            self.screenshot.storage = PathBuf::from(dir);
        }

        if let Ok(enabled) = std::env::var("BMC_ACTOR_S3_ENABLED") {
            self.s3.enabled = matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(level) = std::env::var("BMC_ACTOR_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key, any
/// other value replaces what was there.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_to, "0.0.0.0:8000");
        assert_eq!(config.ipmi.interface, "lanplus");
        assert_eq!(config.screenshot.url_prefix, "/screenshot");
        assert!(!config.s3.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::default();
        config.bmc.password = "bmc-secret".into();
        config.s3.secret_access_key = "s3-secret".into();
        let debug = format!("{config:?}");
        assert!(!debug.contains("bmc-secret"));
        assert!(!debug.contains("s3-secret"));
    }

    #[test]
    fn test_merge_values_is_deep() {
        let mut base = serde_json::json!({"bmc": {"username": "a", "password": "p"}, "x": 1});
        merge_values(
            &mut base,
            serde_json::json!({"bmc": {"username": "b"}, "x": 2}),
        );
        assert_eq!(
            base,
            serde_json::json!({"bmc": {"username": "b", "password": "p"}, "x": 2})
        );
    }

    #[test]
    #[serial]
    fn test_load_explicit_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[bmc]\nusername = \"root\"\npassword = \"calvin\"\n\n[screenshot]\nstorage = \"/var/shots\""
        )
        .unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.bmc.username, "root");
        assert_eq!(config.bmc.credentials().password(), "calvin");
        assert_eq!(config.screenshot.storage, PathBuf::from("/var/shots"));
        assert_eq!(config.server.bind_to, "0.0.0.0:8000");
    }

    #[test]
    #[serial]
    fn test_unknown_extension_falls_back_to_yaml() {
        let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        writeln!(file, "ipmi:\n  interface: lan").unwrap();
        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.ipmi.interface, "lan");
    }

    #[test]
    #[serial]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "server:\n  bind_to: 127.0.0.1:9000\nlogging:\n  format: json").unwrap();
        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.bind_to, "127.0.0.1:9000");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[bmc]\nusername = \"root\"").unwrap();

        std::env::set_var("BMC_ACTOR_BMC_USER", "operator");
        std::env::set_var("BMC_ACTOR_S3_ENABLED", "true");
        let config = Config::load(Some(&file.path().to_path_buf()));
        std::env::remove_var("BMC_ACTOR_BMC_USER");
        std::env::remove_var("BMC_ACTOR_S3_ENABLED");

        let config = config.unwrap();
        assert_eq!(config.bmc.username, "operator");
        assert!(config.s3.enabled);
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[bmc\nusername = ").unwrap();
        assert!(Config::load(Some(&file.path().to_path_buf())).is_err());
    }
}
