//! Configuration for tracing output

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Crates whose events are enabled by the default filter
const KONATA_TARGETS: [&str; 3] = ["konata", "konata_core", "konata_http"];

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name recorded in the startup event
    pub service_name: String,
    /// Log level applied to the KonataBlog crates (e.g., "info", "debug")
    pub log_level: String,
    /// Optional file that receives a copy of every event (no ANSI colors)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Colorize console output
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

const fn default_ansi() -> bool {
    true
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "konata".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            ansi: true,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// - `KONATA_LOG`: log level for the KonataBlog crates
    /// - `KONATA_LOG_FILE`: path of the log file
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("KONATA_LOG").unwrap_or(defaults.log_level),
            log_file: std::env::var("KONATA_LOG_FILE").ok().map(PathBuf::from),
            ..defaults
        }
    }

    /// Development configuration with verbose output
    pub fn dev() -> Self {
        Self {
            service_name: "konata-dev".to_string(),
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        KONATA_TARGETS
            .iter()
            .map(|target| format!("{target}={}", self.log_level))
            .collect::<Vec<_>>()
            .join(",")
    }
}
