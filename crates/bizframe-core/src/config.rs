//! Framework configuration with validation.
//!
//! Defaults are suitable for most hosts; `from_env` lets a deployment tune the
//! rule engine and notification bus without recompiling.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid rule configuration: {0}")]
    InvalidRules(String),

    #[error("Invalid notification configuration: {0}")]
    InvalidNotification(String),

    #[error("Invalid idle configuration: {0}")]
    InvalidIdle(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

/// Main framework configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Rule engine behaviour
    pub rules: RuleConfig,
    /// Notification bus sizing
    pub notifications: NotificationConfig,
    /// Idle-wait defaults
    pub idle: IdleConfig,
}

impl FrameworkConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `BF_PROCESS_THROUGH_PRIORITY`: keep running rules up to this priority after an error (default: 0)
    /// - `BF_CASCADE_ON_DIRTY`: run rules for properties changed by rule outputs (default: false)
    /// - `BF_MAX_RULE_DEPTH`: nested rule-run limit (default: 32)
    /// - `BF_EVENT_CAPACITY`: notification bus buffer per subscriber (default: 1000)
    /// - `BF_IDLE_TIMEOUT_MS`: default idle wait (default: 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_env("BF_PROCESS_THROUGH_PRIORITY")? {
            config.rules.process_through_priority = v;
        }
        if let Ok(v) = env::var("BF_CASCADE_ON_DIRTY") {
            config.rules.cascade_on_dirty_properties = v.eq_ignore_ascii_case("true") || v == "1";
        }
        if let Some(v) = parse_env("BF_MAX_RULE_DEPTH")? {
            config.rules.max_rule_depth = v;
        }
        if let Some(v) = parse_env("BF_EVENT_CAPACITY")? {
            config.notifications.channel_capacity = v;
        }
        if let Some(v) = parse_env("BF_IDLE_TIMEOUT_MS")? {
            config.idle.default_timeout_ms = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.max_rule_depth == 0 {
            return Err(ConfigError::InvalidRules(
                "max_rule_depth cannot be 0".into(),
            ));
        }

        if self.notifications.channel_capacity == 0 {
            return Err(ConfigError::InvalidNotification(
                "channel_capacity cannot be 0".into(),
            ));
        }

        if self.idle.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidIdle(
                "default_timeout_ms cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Rule engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Once a rule reports an error, rules with a priority above this value
    /// are skipped for the rest of the run.
    pub process_through_priority: i32,
    /// Run the rules of properties a rule wrote through its output values.
    pub cascade_on_dirty_properties: bool,
    /// Maximum nesting of rule runs on one object.
    pub max_rule_depth: usize,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            process_through_priority: 0,
            cascade_on_dirty_properties: false,
            max_rule_depth: 32,
        }
    }
}

/// Notification bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Buffered events per subscriber before lagging ones skip ahead
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Idle-wait configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Timeout used by `BusinessObject::wait_until_idle`
    pub default_timeout_ms: u64,
}

impl IdleConfig {
    /// The default timeout as a `Duration`.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
        }
    }
}
