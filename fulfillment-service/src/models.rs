use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FulfillmentError, FulfillmentResult};

/// Named discount class assignable to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: Uuid,
    pub name: String,
    /// Unique, lower-case, no whitespace
    pub code: String,
    /// Percentage in `[0, 100]`, always carried with two decimal places
    pub discount_percentage: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tier {
    pub fn from_new(new: NewTier) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            code: new.code,
            discount_percentage: new.discount_percentage,
            description: new.description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display form used by provider-facing screens, e.g. `Gold (15.00%)`
    pub fn label(&self) -> String {
        format!("{} ({}%)", self.name, self.discount_percentage)
    }
}

/// Validated input for a tier that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTier {
    pub name: String,
    pub code: String,
    pub discount_percentage: Decimal,
    pub description: Option<String>,
}

impl NewTier {
    /// # Errors
    ///
    /// Returns [`FulfillmentError::Validation`] for a blank name or code, or a
    /// percentage outside `[0, 100]`.
    pub fn new(
        name: &str,
        code: &str,
        discount_percentage: Decimal,
        description: Option<&str>,
    ) -> FulfillmentResult<Self> {
        Ok(Self {
            name: required_name(name)?,
            code: required_code(code)?,
            discount_percentage: normalize_percentage(discount_percentage)?,
            description: normalize_description(description),
        })
    }
}

/// Partial update of a tier. `None` leaves the field unchanged; an empty
/// description clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub discount_percentage: Option<Decimal>,
    pub description: Option<Option<String>>,
}

impl TierChanges {
    /// # Errors
    ///
    /// Same rules as [`NewTier::new`] for every field that is present.
    pub fn new(
        name: Option<&str>,
        code: Option<&str>,
        discount_percentage: Option<Decimal>,
        description: Option<&str>,
    ) -> FulfillmentResult<Self> {
        Ok(Self {
            name: name.map(required_name).transpose()?,
            code: code.map(required_code).transpose()?,
            discount_percentage: discount_percentage.map(normalize_percentage).transpose()?,
            description: description.map(|d| normalize_description(Some(d))),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.discount_percentage.is_none()
            && self.description.is_none()
    }

    /// Apply the changes to `tier` and bump `updated_at`
    pub fn apply(&self, tier: &mut Tier) {
        if let Some(name) = &self.name {
            tier.name.clone_from(name);
        }
        if let Some(code) = &self.code {
            tier.code.clone_from(code);
        }
        if let Some(pct) = self.discount_percentage {
            tier.discount_percentage = pct;
        }
        if let Some(description) = &self.description {
            tier.description.clone_from(description);
        }
        tier.updated_at = Utc::now();
    }
}

/// Provider ids are trimmed; ids that parse as UUIDs (upper-case, braced,
/// simple or URN forms) are stored in the lower-case hyphenated form that
/// prescriber ids take on submissions
pub fn normalize_provider_id(id: &str) -> String {
    let id = id.trim();
    Uuid::parse_str(id).map_or_else(|_| id.to_string(), |uuid| uuid.hyphenated().to_string())
}

/// Tier codes are compared lower-case with all whitespace removed
pub fn normalize_tier_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Validate a percentage and fix it to two decimal places
///
/// # Errors
///
/// Returns [`FulfillmentError::Validation`] when the value is outside `[0, 100]`.
pub fn normalize_percentage(value: Decimal) -> FulfillmentResult<Decimal> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(FulfillmentError::Validation(format!(
            "discount percentage must be between 0 and 100, got {value}"
        )));
    }
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    Ok(rounded)
}

fn required_name(name: &str) -> FulfillmentResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FulfillmentError::Validation("tier name is required".into()));
    }
    Ok(name.to_string())
}

fn required_code(code: &str) -> FulfillmentResult<String> {
    let code = normalize_tier_code(code);
    if code.is_empty() {
        return Err(FulfillmentError::Validation("tier code is required".into()));
    }
    Ok(code)
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Provider → tier code mapping, one per provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTierAssignment {
    pub provider_id: String,
    pub tier_code: String,
}

/// Fulfillment lifecycle. Declaration order is lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    Submitted,
    Billing,
    Approved,
    Packed,
    Shipped,
    Delivered,
}

impl PrescriptionStatus {
    pub const ALL: [Self; 6] = [
        Self::Submitted,
        Self::Billing,
        Self::Approved,
        Self::Packed,
        Self::Shipped,
        Self::Delivered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Billing => "billing",
            Self::Approved => "approved",
            Self::Packed => "packed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = FulfillmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                FulfillmentError::Validation(format!(
                    "unknown prescription status '{s}', expected one of: submitted, billing, approved, packed, shipped, delivered"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriberDetails {
    pub first_name: String,
    pub last_name: String,
    pub npi: String,
    #[serde(default)]
    pub dea: Option<String>,
}

impl PrescriberDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Prescription as recorded after the pharmacy accepted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    /// Correlation id issued by the pharmacy system
    pub queue_id: String,
    pub status: PrescriptionStatus,
    pub prescriber_id: Uuid,
    pub patient_id: Uuid,
    pub encounter_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub medication: Option<String>,
    pub medication_id: Option<String>,
    pub dosage: Option<String>,
    pub dosage_form: Option<String>,
    pub quantity: i32,
    pub refills: i32,
    pub sig: String,
    pub dispense_as_written: bool,
    pub pharmacy_notes: Option<String>,
    pub pharmacy_id: Option<String>,
    /// Backend the order went through
    pub backend_id: Uuid,
    pub profit_cents: i64,
    pub shipping_fee_cents: i64,
    pub tracking_number: Option<String>,
    pub custom_address: Option<ShippingAddress>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing filter; every present field must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PrescriptionFilter {
    pub queue_id: Option<String>,
    pub status: Option<PrescriptionStatus>,
    pub prescriber_id: Option<Uuid>,
}

impl PrescriptionFilter {
    pub fn matches(&self, prescription: &Prescription) -> bool {
        self.queue_id
            .as_deref()
            .map_or(true, |q| q == prescription.queue_id)
            && self.status.map_or(true, |s| s == prescription.status)
            && self
                .prescriber_id
                .map_or(true, |p| p == prescription.prescriber_id)
    }
}

/// Pharmacy API credential. Never printed in clear.
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::new(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// First and last four characters, the rest masked
    pub fn masked(&self) -> String {
        logger_redacted::mask_secret(self.expose())
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

/// Credentials and endpoint for one pharmacy integration
#[derive(Debug, Clone)]
pub struct PharmacyBackend {
    pub id: Uuid,
    pub pharmacy_id: String,
    pub store_id: String,
    pub api_key: ApiKey,
    /// Overrides the default pharmacy API endpoint when set
    pub base_url: Option<String>,
    pub system_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPharmacyBackend {
    pub pharmacy_id: String,
    pub store_id: String,
    pub api_key: ApiKey,
    pub base_url: Option<String>,
    pub system_type: String,
    pub is_active: bool,
}

impl NewPharmacyBackend {
    /// # Errors
    ///
    /// Returns [`FulfillmentError::Validation`] when an identifier or the key is blank.
    pub fn validate(&self) -> FulfillmentResult<()> {
        for (field, value) in [
            ("pharmacy_id", self.pharmacy_id.as_str()),
            ("store_id", self.store_id.as_str()),
            ("api_key", self.api_key.expose()),
            ("system_type", self.system_type.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(FulfillmentError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }

    pub fn into_backend(self) -> PharmacyBackend {
        let now = Utc::now();
        PharmacyBackend {
            id: Uuid::new_v4(),
            pharmacy_id: self.pharmacy_id,
            store_id: self.store_id,
            api_key: self.api_key,
            base_url: self.base_url,
            system_type: self.system_type,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
    Warning,
    Info,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Who triggered an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            name: "system".to_string(),
            email: String::new(),
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLogEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub action: String,
    pub user_name: String,
    pub user_email: String,
    pub details: serde_json::Value,
    pub queue_id: Option<String>,
    pub status: LogStatus,
}

impl SystemLogEntry {
    pub fn new(action: impl Into<String>, status: LogStatus) -> Self {
        let actor = Actor::system();
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            action: action.into(),
            user_name: actor.name,
            user_email: actor.email,
            details: serde_json::Value::Null,
            queue_id: None,
            status,
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor: &Actor) -> Self {
        self.user_name.clone_from(&actor.name);
        self.user_email.clone_from(&actor.email);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn with_queue_id(mut self, queue_id: impl Into<String>) -> Self {
        self.queue_id = Some(queue_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn uuid_provider_ids_are_canonicalized() {
        let canonical = "6f1c1f5e-8a44-4c2e-9c4e-0d3c3f4b1a01";
        assert_eq!(normalize_provider_id(" 6F1C1F5E-8A44-4C2E-9C4E-0D3C3F4B1A01 "), canonical);
        assert_eq!(normalize_provider_id("{6f1c1f5e-8a44-4c2e-9c4e-0d3c3f4b1a01}"), canonical);
        assert_eq!(normalize_provider_id("6f1c1f5e8a444c2e9c4e0d3c3f4b1a01"), canonical);
        assert_eq!(normalize_provider_id(" prov-1 "), "prov-1");
    }

    #[test]
    fn tier_code_is_lowercased_and_whitespace_stripped() {
        assert_eq!(normalize_tier_code(" Gold Plus\t"), "goldplus");
        assert_eq!(normalize_tier_code("VIP"), "vip");
    }

    #[test]
    fn percentage_is_fixed_to_two_places() {
        assert_eq!(normalize_percentage(pct("15")).unwrap().to_string(), "15.00");
        assert_eq!(normalize_percentage(pct("12.345")).unwrap().to_string(), "12.35");
        assert!(normalize_percentage(pct("100.01")).is_err());
        assert!(normalize_percentage(pct("-1")).is_err());
    }

    #[test]
    fn new_tier_rejects_blank_code() {
        let err = NewTier::new("Gold", "   ", pct("10"), None).unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(_)));
    }

    #[test]
    fn tier_label_shows_two_decimals() {
        let tier = Tier::from_new(NewTier::new("Gold", "GOLD", pct("15"), Some("  ")).unwrap());
        assert_eq!(tier.label(), "Gold (15.00%)");
        assert_eq!(tier.code, "gold");
        assert_eq!(tier.description, None);
    }

    #[test]
    fn tier_changes_apply_only_present_fields() {
        let mut tier = Tier::from_new(NewTier::new("Gold", "gold", pct("15"), Some("old")).unwrap());
        let changes = TierChanges::new(None, None, Some(pct("20")), Some("")).unwrap();
        changes.apply(&mut tier);
        assert_eq!(tier.name, "Gold");
        assert_eq!(tier.discount_percentage.to_string(), "20.00");
        assert_eq!(tier.description, None);
    }

    #[test]
    fn status_order_follows_lifecycle() {
        assert!(PrescriptionStatus::Submitted < PrescriptionStatus::Billing);
        assert!(PrescriptionStatus::Shipped < PrescriptionStatus::Delivered);
        assert_eq!("packed".parse::<PrescriptionStatus>().unwrap(), PrescriptionStatus::Packed);
        assert!("Shipped".parse::<PrescriptionStatus>().is_err());
        assert!("cancelled".parse::<PrescriptionStatus>().is_err());
    }

    #[test]
    fn api_key_debug_is_masked() {
        let key = ApiKey::new("sk_live_1234567890");
        assert_eq!(format!("{key:?}"), "ApiKey(sk_l**********7890)");
        assert_eq!(key.clone().expose(), "sk_live_1234567890");
    }
}
