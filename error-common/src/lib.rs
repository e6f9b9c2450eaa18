//! Error codes shared across the fulfillment platform
//!
//! Every crate in the workspace keeps its own `thiserror` enum for the
//! failures it understands. What they share is the set of stable identifiers
//! returned in API error bodies, so that clients can branch on a failure
//! without parsing messages.
//!
//! # Example
//!
//! ```rust
//! use error_common::codes;
//!
//! assert_eq!(codes::pharmacy::SUBMISSION_FAILED.as_str(), "PHARMACY_5002");
//! assert_eq!(codes::store::DUPLICATE_KEY.to_string(), "STORE_4002");
//! ```

pub mod codes;

pub use codes::ErrorCode;
