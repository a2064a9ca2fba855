//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full directive
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "bizframe".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BF_SERVICE_NAME`: Service name (default: bizframe)
    /// - `BF_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `BF_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `BF_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("BF_SERVICE_NAME").unwrap_or_else(|_| "bizframe".to_string()),

            log_level: env::var("BF_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("BF_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("BF_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }

    /// Configuration for a named host application.
    pub fn for_service(name: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = name.to_string();
        config
    }

    /// Quiet configuration for test binaries.
    pub fn for_tests() -> Self {
        Self {
            service_name: "bizframe-tests".to_string(),
            log_level: "warn".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}
