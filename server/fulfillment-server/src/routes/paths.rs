//! Route path constants shared by the router and the integration tests

/// API base path
pub const API_V1: &str = "/api/v1";

pub mod health {
    pub const HEALTH: &str = "/health";
}

/// Discount tier administration
pub mod tiers {
    pub const TIERS: &str = "/tiers";
    pub const TIER_BY_ID: &str = "/tiers/:id";
    pub const TIER_BY_CODE: &str = "/tiers/by-code/:code";
}

/// Provider to tier assignments
pub mod provider_tiers {
    pub const ASSIGNMENTS: &str = "/provider-tiers";
    pub const BY_PROVIDER: &str = "/provider-tiers/:provider_id";
    pub const DISCOUNT: &str = "/provider-tiers/:provider_id/discount";
}

pub mod prescriptions {
    pub const PRESCRIPTIONS: &str = "/prescriptions";
    pub const PRESCRIPTION_BY_ID: &str = "/prescriptions/:id";
}

/// Inbound callbacks from the pharmacy system
pub mod webhooks {
    pub const PRESCRIPTION_STATUS: &str = "/webhooks/prescription-status";
}

pub mod pharmacy_backends {
    pub const BACKENDS: &str = "/pharmacy-backends";
    pub const ACTIVATION: &str = "/pharmacy-backends/:id/activation";
}
