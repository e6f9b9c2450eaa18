//! HIPAA-compliant logging support
//!
//! Two concerns live here:
//!
//! - **Tracing setup**: one call to [`init_tracing`] installs the global
//!   subscriber with an `EnvFilter`, pretty output for development and JSON
//!   lines for production.
//! - **Redaction**: audit trail details routinely carry patient emails and
//!   phone numbers, and integration credentials must never reach a log in
//!   clear. [`PiiRedactor`] rewrites free text and JSON values before they are
//!   persisted, and [`mask_secret`] produces the only printable form of an
//!   API key.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{mask_secret, PiiRedactor, RedactionConfig};
//!
//! let redactor = PiiRedactor::new(RedactionConfig {
//!     hash_for_correlation: false,
//!     ..Default::default()
//! });
//! assert_eq!(redactor.redact("call (555) 123-4567"), "call (***) ***-****");
//! assert_eq!(mask_secret("sk_live_1234567890"), "sk_l**********7890");
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when it is set.
///
/// # Errors
///
/// Returns [`LoggerError::Init`] when a global subscriber is already installed.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fulfillment_server={level},fulfillment_service={level},database_layer={level},tower_http=info,sqlx=warn,hyper=info,reqwest=info",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339()),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| LoggerError::Init(e.to_string()))
}
