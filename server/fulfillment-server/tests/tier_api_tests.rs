mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

const NO_PHARMACY: &str = "http://127.0.0.1:9";

async fn create_gold(app: &TestApp) -> serde_json::Value {
    let (status, body) = app
        .post(
            "/api/v1/tiers",
            json!({
                "tierName": "Gold",
                "tierCode": " GOLD ",
                "discountPercentage": 15,
                "description": "Top volume prescribers"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn health_reports_memory_storage() {
    let app = TestApp::new(NO_PHARMACY);
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["checks"]["database"], "not_configured");
}

#[tokio::test]
async fn created_tier_reads_back_by_code() {
    let app = TestApp::new(NO_PHARMACY);
    let created = create_gold(&app).await;

    assert_eq!(created["tierName"], "Gold");
    assert_eq!(created["tierCode"], "gold");
    assert_eq!(created["discountPercentage"], "15.00");
    assert_eq!(created["tierLevel"], "Gold (15.00%)");

    let (status, body) = app.get("/api/v1/tiers/by-code/Gold").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], created["id"]);
    assert_eq!(body["data"]["tierName"], created["tierName"]);
    assert_eq!(body["data"]["discountPercentage"], created["discountPercentage"]);

    let (_, list) = app.get("/api/v1/tiers").await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_code_conflicts() {
    let app = TestApp::new(NO_PHARMACY);
    create_gold(&app).await;

    let (status, body) = app
        .post(
            "/api/v1/tiers",
            json!({ "tierName": "Gold Plus", "tierCode": "gold", "discountPercentage": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_type"], "duplicate_key");
    assert_eq!(body["error_code"], "STORE_4002");
}

#[tokio::test]
async fn percentage_outside_range_is_rejected() {
    let app = TestApp::new(NO_PHARMACY);
    let (status, body) = app
        .post(
            "/api/v1/tiers",
            json!({ "tierName": "Silly", "tierCode": "silly", "discountPercentage": 150 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");

    let (status, _) = app
        .post("/api/v1/tiers", json!({ "tierName": "", "tierCode": "x", "discountPercentage": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_and_delete_tier() {
    let app = TestApp::new(NO_PHARMACY);
    let created = create_gold(&app).await;
    let uri = format!("/api/v1/tiers/{}", created["id"].as_str().unwrap());

    let (status, body) = app.put(&uri, json!({ "discountPercentage": 20.5 })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["discountPercentage"], "20.50");
    assert_eq!(body["data"]["tierName"], "Gold");

    let (status, _) = app.put(&uri, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");

    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_tier_id_is_a_validation_error() {
    let app = TestApp::new(NO_PHARMACY);
    let (status, body) = app.get("/api/v1/tiers/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_1003");
}

#[tokio::test]
async fn dangling_assignment_reads_as_not_set() {
    let app = TestApp::new(NO_PHARMACY);
    let (status, body) = app
        .post(
            "/api/v1/provider-tiers",
            json!({ "providerId": "prov-1", "tierCode": "Platinum" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["tierCode"], "platinum");

    let (status, body) = app.get("/api/v1/provider-tiers/prov-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier_level"], "Not set");
    assert_eq!(body["tier_code"], "platinum");

    let (_, discount) = app.get("/api/v1/provider-tiers/prov-1/discount").await;
    assert_eq!(discount["status"], "not_set");

    app.post(
        "/api/v1/tiers",
        json!({ "tierName": "Platinum", "tierCode": "platinum", "discountPercentage": "25" }),
    )
    .await;

    let (_, body) = app.get("/api/v1/provider-tiers/prov-1").await;
    assert_eq!(body["tier_level"], "Platinum (25.00%)");

    let (_, discount) = app.get("/api/v1/provider-tiers/prov-1/discount").await;
    assert_eq!(discount["status"], "set");
    assert_eq!(discount["tier_name"], "Platinum");
    assert_eq!(discount["discount_percentage"], "25.00");
}

#[tokio::test]
async fn unassigned_provider_and_removal() {
    let app = TestApp::new(NO_PHARMACY);
    let (_, body) = app.get("/api/v1/provider-tiers/nobody").await;
    assert_eq!(body["tier_level"], "Not set");
    assert!(body["tier_code"].is_null());

    app.post(
        "/api/v1/provider-tiers",
        json!({ "providerId": "prov-2", "tierCode": "gold" }),
    )
    .await;
    let (_, list) = app.get("/api/v1/provider-tiers").await;
    assert_eq!(list["data"][0]["providerId"], "prov-2");

    let (status, _) = app.delete("/api/v1/provider-tiers/prov-2").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete("/api/v1/provider-tiers/prov-2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assignment_requires_both_fields() {
    let app = TestApp::new(NO_PHARMACY);
    let (status, _) = app
        .post("/api/v1/provider-tiers", json!({ "providerId": "prov-1", "tierCode": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/v1/provider-tiers", json!({ "providerId": "prov-1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
