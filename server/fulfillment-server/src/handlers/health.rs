use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::FulfillmentServer;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` while the primary store is unreachable
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub storage: String,
    pub uptime: u64,
    pub checks: HashMap<String, String>,
}

/// Always 200: the service keeps answering from its fallback stores while
/// the database is down.
pub async fn health_check(State(server): State<FulfillmentServer>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut degraded = false;

    match &server.database {
        Some(database) => {
            let healthy = database.is_healthy().await;
            degraded = !healthy;
            checks.insert(
                "database".to_string(),
                if healthy { "healthy" } else { "unreachable" }.to_string(),
            );
        }
        None => {
            checks.insert("database".to_string(), "not_configured".to_string());
        }
    }

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: server.config.storage.to_string(),
        uptime: server.uptime_seconds(),
        checks,
    })
}
