//! Configuration file support for the AIS tracker.
//!
//! Loads settings from `~/.config/ais-tracker/config.toml` on Linux
//! (or platform-appropriate location on other OSes).
//!
//! Channel parameters live in a flat key-value `[properties]` table using
//! `channel.<id>.<key>` keys, so they can be read and written back without
//! knowing every channel type in advance.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Default feed host for a channel.
pub const DEFAULT_HOST: &str = "localhost";

/// Default feed port for a channel.
pub const DEFAULT_PORT: u16 = 4030;

/// Trail recording settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Maximum points kept per vessel.
    pub max_points: usize,

    /// Minimum movement in meters before a new point is recorded.
    pub min_distance_m: f64,

    /// Record a point at least this often (seconds) even without movement.
    pub max_interval_secs: u64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            max_points: 500,
            min_distance_m: 10.0,
            max_interval_secs: 60,
        }
    }
}

/// A property value. TOML integers and booleans are kept as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PropertyValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl From<PropertyValue> for String {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Text(s) => s,
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Bool(b) => b.to_string(),
        }
    }
}

/// Flat string key-value settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "BTreeMap<String, PropertyValue>")]
pub struct Properties(BTreeMap<String, String>);

impl From<BTreeMap<String, PropertyValue>> for Properties {
    fn from(map: BTreeMap<String, PropertyValue>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key`, or `default` when unset.
    pub fn get_property(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Integer value for `key`, or `default` when unset or not a number.
    pub fn get_int_property<T>(&self, key: &str, default: T) -> T
    where
        T: std::str::FromStr,
    {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }
}

/// Property key for a channel setting, e.g. `channel.ais1.host`.
pub fn channel_key(ident: &str, key: &str) -> String {
    format!("channel.{}.{}", ident, key)
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifiers of the channels to run.
    pub channels: Vec<String>,

    /// Channel settings (`channel.<id>.host`, `.port`, `.tag`).
    pub properties: Properties,

    /// Trail recording settings.
    pub trail: TrailConfig,

    /// Log channel throughput every N seconds.
    pub throughput_interval: u64,

    /// Enable Prometheus metrics HTTP endpoint.
    pub metrics_enabled: bool,

    /// Port for Prometheus metrics HTTP endpoint.
    pub metrics_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            properties: Properties::default(),
            trail: TrailConfig::default(),
            throughput_interval: 120,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the default location if `None`.
    ///
    /// Returns default config if the default file doesn't exist.
    /// Returns an error if the file exists but is malformed, or if an
    /// explicitly given file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ais-tracker/config.toml"))
    }

    /// Validate all configuration settings.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (i, ident) in self.channels.iter().enumerate() {
            if ident.trim().is_empty() || ident.contains('.') {
                bail!("Invalid channel identifier [{}]: {:?}", i, ident);
            }
            if !seen.insert(ident.as_str()) {
                bail!("Duplicate channel identifier: {}", ident);
            }
        }
        if self.trail.max_points == 0 {
            bail!("trail.max_points must be at least 1");
        }
        if self.throughput_interval == 0 {
            bail!("throughput_interval must be at least 1 second");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.channels.is_empty());
        assert_eq!(config.throughput_interval, 120);
        assert!(!config.metrics_enabled);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.trail.max_points, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            channels = ["ais1"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.channels, vec!["ais1"]);
        assert_eq!(config.trail.min_distance_m, 10.0);
        assert_eq!(
            config
                .properties
                .get_property(&channel_key("ais1", "host"), DEFAULT_HOST),
            "localhost"
        );
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            channels = ["ais1", "ais2"]
            throughput_interval = 60
            metrics_enabled = true
            metrics_port = 9091

            [properties]
            "channel.ais1.host" = "ais.example.net"
            "channel.ais1.port" = 5631
            "channel.ais2.port" = "4001"
            "channel.ais2.tag" = "coastal"

            [trail]
            max_points = 100
            min_distance_m = 25.0
            max_interval_secs = 300
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.throughput_interval, 60);
        assert!(config.metrics_enabled);
        assert_eq!(config.metrics_port, 9091);

        let p = &config.properties;
        assert_eq!(p.get("channel.ais1.host"), Some("ais.example.net"));
        assert_eq!(p.get_int_property("channel.ais1.port", DEFAULT_PORT), 5631);
        assert_eq!(p.get_int_property("channel.ais2.port", DEFAULT_PORT), 4001);
        assert_eq!(p.get("channel.ais2.tag"), Some("coastal"));

        assert_eq!(config.trail.max_points, 100);
        assert_eq!(config.trail.max_interval_secs, 300);
    }

    #[test]
    fn test_int_property_fallback() {
        let mut p = Properties::new();
        assert_eq!(p.get_int_property("channel.x.port", 4030u16), 4030);
        p.set_property("channel.x.port", "not a number");
        assert_eq!(p.get_int_property("channel.x.port", 4030u16), 4030);
        p.set_property("channel.x.port", 70000);
        assert_eq!(p.get_int_property("channel.x.port", 4030u16), 4030);
        p.set_property("channel.x.port", 21);
        assert_eq!(p.get_int_property("channel.x.port", 4030u16), 21);
    }

    #[test]
    fn test_validate_rejects_bad_channels() {
        let config = Config {
            channels: vec!["a".to_string(), "a".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            channels: vec!["a.b".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/ais-tracker.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
