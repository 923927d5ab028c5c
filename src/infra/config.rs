//! Configuration loading from TOML files
//!
//! The watch set (required items and doors) has no sensible default, so a
//! missing or empty configuration is fatal at startup: the solver refuses to
//! run with nothing to watch.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct WorldModelConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Client port of the world model (for subscribing to data)
    #[serde(default = "default_client_port")]
    pub client_port: u16,
    /// Solver port of the world model (for publishing alerts)
    #[serde(default = "default_solver_port")]
    pub solver_port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_client_port() -> u16 {
    7010
}

fn default_solver_port() -> u16 {
    7009
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_publish_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Identifiers of items that must leave the building together
    pub required_items: Vec<String>,
    /// Identifiers of doors to watch
    pub doors: Vec<String>,
    #[serde(default = "default_mobility_attributes")]
    pub mobility_attributes: Vec<String>,
    #[serde(default = "default_door_attributes")]
    pub door_attributes: Vec<String>,
    /// The door sensor publishes its "closed" state; when true the decoded
    /// boolean is inverted to get "open"
    #[serde(default = "default_door_value_is_closed")]
    pub door_value_is_closed: bool,
    /// Grace period after last movement during which an item still counts
    /// as present
    #[serde(default = "default_delay_tolerance_secs")]
    pub delay_tolerance_secs: u64,
}

fn default_mobility_attributes() -> Vec<String> {
    vec!["mobility".to_string()]
}

fn default_door_attributes() -> Vec<String> {
    vec!["closed".to_string()]
}

fn default_door_value_is_closed() -> bool {
    true
}

fn default_delay_tolerance_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_alert_attribute")]
    pub attribute: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Treat an all-missing evaluation as a sensor anomaly and raise nothing
    #[serde(default = "default_suppress_all_missing")]
    pub suppress_all_missing: bool,
}

fn default_alert_attribute() -> String {
    "left behind".to_string()
}

fn default_origin() -> String {
    "leftbehind-solver".to_string()
}

fn default_suppress_all_missing() -> bool {
    true
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            attribute: default_alert_attribute(),
            origin: default_origin(),
            suppress_all_missing: default_suppress_all_missing(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_interval_secs")]
    pub interval_secs: u64,
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { interval_secs: default_stats_interval_secs() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub world_model: WorldModelConfig,
    pub watch: WatchConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    host: String,
    client_port: u16,
    solver_port: u16,
    connect_timeout_ms: u64,
    publish_timeout_ms: u64,
    required_items: Vec<String>,
    doors: Vec<String>,
    mobility_attributes: Vec<String>,
    door_attributes: Vec<String>,
    door_value_is_closed: bool,
    delay_tolerance_secs: u64,
    alert_attribute: String,
    origin: String,
    suppress_all_missing: bool,
    poll_interval_ms: u64,
    reconnect_delay_ms: u64,
    stats_interval_secs: u64,
    config_file: String,
}

impl Config {
    /// Load configuration from a TOML file. Unreadable file, parse failure,
    /// or an empty watch set is a startup error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Self::from_toml(toml_config, path.display().to_string())
    }

    fn from_toml(toml_config: TomlConfig, config_file: String) -> anyhow::Result<Self> {
        if toml_config.watch.required_items.is_empty() {
            bail!("watch.required_items is empty: nothing to track");
        }
        if toml_config.watch.doors.is_empty() {
            bail!("watch.doors is empty: no door to watch");
        }
        if toml_config.watch.mobility_attributes.is_empty() {
            bail!("watch.mobility_attributes is empty");
        }
        if toml_config.watch.door_attributes.is_empty() {
            bail!("watch.door_attributes is empty");
        }

        Ok(Self {
            host: toml_config.world_model.host,
            client_port: toml_config.world_model.client_port,
            solver_port: toml_config.world_model.solver_port,
            connect_timeout_ms: toml_config.world_model.connect_timeout_ms,
            publish_timeout_ms: toml_config.world_model.publish_timeout_ms,
            required_items: toml_config.watch.required_items,
            doors: toml_config.watch.doors,
            mobility_attributes: toml_config.watch.mobility_attributes,
            door_attributes: toml_config.watch.door_attributes,
            door_value_is_closed: toml_config.watch.door_value_is_closed,
            delay_tolerance_secs: toml_config.watch.delay_tolerance_secs,
            alert_attribute: toml_config.alert.attribute,
            origin: toml_config.alert.origin,
            suppress_all_missing: toml_config.alert.suppress_all_missing,
            poll_interval_ms: toml_config.poll.interval_ms,
            reconnect_delay_ms: toml_config.poll.reconnect_delay_ms,
            stats_interval_secs: toml_config.stats.interval_secs,
            config_file,
        })
    }

    // Getters for all config fields
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn client_port(&self) -> u16 {
        self.client_port
    }

    pub fn solver_port(&self) -> u16 {
        self.solver_port
    }

    pub fn connect_timeout_ms(&self) -> u64 {
        self.connect_timeout_ms
    }

    pub fn publish_timeout_ms(&self) -> u64 {
        self.publish_timeout_ms
    }

    pub fn required_items(&self) -> &[String] {
        &self.required_items
    }

    pub fn doors(&self) -> &[String] {
        &self.doors
    }

    pub fn mobility_attributes(&self) -> &[String] {
        &self.mobility_attributes
    }

    pub fn door_attributes(&self) -> &[String] {
        &self.door_attributes
    }

    pub fn door_value_is_closed(&self) -> bool {
        self.door_value_is_closed
    }

    pub fn delay_tolerance_secs(&self) -> u64 {
        self.delay_tolerance_secs
    }

    pub fn delay_tolerance_ms(&self) -> u64 {
        self.delay_tolerance_secs * 1000
    }

    pub fn alert_attribute(&self) -> &str {
        &self.alert_attribute
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn suppress_all_missing(&self) -> bool {
        self.suppress_all_missing
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn reconnect_delay_ms(&self) -> u64 {
        self.reconnect_delay_ms
    }

    pub fn stats_interval_secs(&self) -> u64 {
        self.stats_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Build directly from parsed TOML, for in-crate tests
    #[cfg(test)]
    pub fn from_toml_for_test(toml_config: TomlConfig) -> Self {
        Self::from_toml(toml_config, "test".to_string()).unwrap()
    }
}
