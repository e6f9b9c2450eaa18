//! Shape checks on request bodies before they reach the domain layer
//!
//! Handlers call [`RequestValidation::validate`] first; the domain
//! constructors then enforce value rules such as the percentage range and
//! code normalization.

use crate::error::ApiError;

pub trait RequestValidation {
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] naming the first offending field.
    fn validate(&self) -> Result<(), ApiError>;
}

/// Fail validation with `$message` unless `$predicate` holds
///
/// ```ignore
/// validate_field!(self.base_url, url.starts_with("https://"), "base_url must be an http(s) URL");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Non-blank string
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        if $field.trim().is_empty() {
            return Err($crate::error::ApiError::missing_field($message));
        }
    };
}

/// Character count of the trimmed value within `[$min, $max]`
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.trim().chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Absolute http or https URL
#[macro_export]
macro_rules! validate_http_url {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(
            $field,
            $field.starts_with("http://") || $field.starts_with("https://"),
            $message
        );
    };
}
