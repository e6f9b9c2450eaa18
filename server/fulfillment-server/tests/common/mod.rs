#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use fulfillment_server::{create_app, FulfillmentServer, ServerConfig, StorageMode};

/// Router over in-memory storage; documents land in a temp directory
pub struct TestApp {
    pub app: Router,
    _documents: TempDir,
}

impl TestApp {
    pub fn new(pharmacy_url: &str) -> Self {
        Self::with_config(pharmacy_url, |_| {})
    }

    pub fn with_config(pharmacy_url: &str, adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let documents = TempDir::new().unwrap();
        let mut config = ServerConfig {
            document_storage_path: documents.path().to_path_buf(),
            pharmacy_api_base_url: pharmacy_url.to_string(),
            ..ServerConfig::default()
        }
        .with_storage(StorageMode::Memory);
        adjust(&mut config);

        let server = FulfillmentServer::in_memory(config).unwrap();
        Self {
            app: create_app(server),
            _documents: documents,
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body), &[]).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body), &[]).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, None, &[]).await
    }

    /// Register an active backend pointing at `base_url`
    pub async fn register_backend(&self, base_url: &str, api_key: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/pharmacy-backends",
                json!({
                    "pharmacy_id": "PH-1",
                    "store_id": "store-1",
                    "api_key": api_key,
                    "base_url": base_url,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

/// A valid wizard submission for the default pharmacy
pub fn submission() -> Value {
    json!({
        "prescriber_id": "6f1c1f5e-8a44-4c2e-9c4e-0d3c3f4b1a01",
        "patient_id": "0b8e7a4d-2f6b-4d0e-8a7e-5c1f2a9b3c02",
        "medication": "Semaglutide",
        "dosage": "0.25mg",
        "quantity": 30,
        "refills": 2,
        "sig": "Inject 0.25mg subcutaneously once weekly",
        "pharmacy_id": "PH-1",
        "oversight_fees": [{ "label": "Dose titration monitoring", "amount": "25.00" }],
        "shipping_fee": "9.99",
        "patient": {
            "first_name": "Pat",
            "last_name": "Doe",
            "date_of_birth": "1990-01-01",
            "phone": "(555) 123-4567",
            "email": "pat@example.com"
        },
        "prescriber": {
            "first_name": "Ada",
            "last_name": "Lovelace",
            "npi": "1234567890",
            "dea": "AL1234563"
        }
    })
}
