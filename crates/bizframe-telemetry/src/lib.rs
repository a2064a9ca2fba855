//! # Bizframe Telemetry
//!
//! Structured logging for applications built on Bizframe.
//!
//! The engine only emits `tracing` events; a host decides where they go by
//! installing a subscriber once at startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bizframe_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // Business objects log through `tracing` from here on
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BF_SERVICE_NAME` | `bizframe` | Service name on every log line |
//! | `BF_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `BF_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `BF_JSON_LOGS` | `false` (`true` in containers) | JSON formatting |

mod config;
mod logging;
mod subscriber;

pub use config::TelemetryConfig;
pub use subscriber::TelemetryGuard;

#[doc(hidden)]
pub use tracing;

use std::sync::OnceLock;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),
}

/// Install the global subscriber.
///
/// Returns a guard to hold for the lifetime of the application. Fails if a
/// global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    subscriber::init_subscriber(&config)
}

/// Install a quiet subscriber once per test binary; later calls do nothing.
pub fn init_for_tests() {
    static INSTALLED: OnceLock<Option<TelemetryGuard>> = OnceLock::new();
    INSTALLED.get_or_init(|| init_telemetry(TelemetryConfig::for_tests()).ok());
}
