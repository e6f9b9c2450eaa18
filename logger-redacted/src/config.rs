// Logger configuration
use serde::{Deserialize, Serialize};

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, colored when attached to a terminal
    Pretty,
    /// One JSON object per line for log shippers
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub log_level: String,
    pub format: LogFormat,
}

impl LoggerConfig {
    /// Build the logger configuration from the environment.
    ///
    /// `FULFILLMENT_ENV=production` switches to JSON output.
    pub fn from_env(verbose: bool) -> Self {
        let production = std::env::var("FULFILLMENT_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Self {
            log_level: if verbose { "debug" } else { "info" }.to_string(),
            format: if production { LogFormat::Json } else { LogFormat::Pretty },
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
