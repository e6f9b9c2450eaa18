//! Prescription submission and pharmacy fulfillment
//!
//! Provides:
//! - Discount tiers and provider tier assignments, each behind a primary store
//!   with a degraded-mode fallback
//! - Discount resolution for a provider
//! - Pharmacy backend selection and the outbound pharmacy API client
//! - End-to-end prescription submission with optional document attachment
//! - Status webhooks from the pharmacy system
//! - An append-only system log written by all of the above

pub mod audit;
pub mod backends;
pub mod catalog;
pub mod documents;
pub mod error;
pub mod fees;
pub mod models;
pub mod pharmacy_api;
pub mod pricing;
pub mod store;
pub mod submission;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit::AuditTrail;
pub use backends::PharmacyBackendRegistry;
pub use catalog::TierCatalog;
pub use documents::{DocumentStore, DocumentUpload, FileSystemDocumentStore};
pub use error::*;
pub use fees::OversightFee;
pub use models::*;
pub use pharmacy_api::{HttpPharmacyClient, PharmacyClient};
pub use pricing::{DiscountResolution, PricingResolver, ProviderTierView};
pub use submission::{SubmissionCoordinator, SubmissionOutcome, SubmissionRequest};
pub use webhook::{StatusCallback, StatusWebhookProcessor, WebhookAck};
