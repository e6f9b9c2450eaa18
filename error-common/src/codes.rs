// Error codes returned in API error bodies.
// Codes are grouped by failure domain; the numeric part never changes once published.

use serde::{Serialize, Serializer};
use std::fmt;

/// Stable, machine-readable error identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

pub mod validation {
    use super::ErrorCode;

    pub const INVALID_INPUT: ErrorCode = ErrorCode::new("VALIDATION_1001");
    pub const MISSING_REQUIRED_FIELD: ErrorCode = ErrorCode::new("VALIDATION_1002");
    pub const INVALID_FORMAT: ErrorCode = ErrorCode::new("VALIDATION_1003");
}

pub mod authentication {
    use super::ErrorCode;

    pub const INVALID_WEBHOOK_TOKEN: ErrorCode = ErrorCode::new("AUTH_2001");
}

pub mod store {
    use super::ErrorCode;

    pub const NOT_FOUND: ErrorCode = ErrorCode::new("STORE_4001");
    pub const DUPLICATE_KEY: ErrorCode = ErrorCode::new("STORE_4002");
    pub const UNAVAILABLE: ErrorCode = ErrorCode::new("STORE_4003");
}

pub mod pharmacy {
    use super::ErrorCode;

    pub const BACKEND_NOT_CONFIGURED: ErrorCode = ErrorCode::new("PHARMACY_5001");
    pub const SUBMISSION_FAILED: ErrorCode = ErrorCode::new("PHARMACY_5002");
    pub const PERSISTENCE_FAILED: ErrorCode = ErrorCode::new("PHARMACY_5003");
}

pub mod system {
    use super::ErrorCode;

    pub const INTERNAL: ErrorCode = ErrorCode::new("SYSTEM_9001");
    pub const CONFIGURATION: ErrorCode = ErrorCode::new("SYSTEM_9002");
}
