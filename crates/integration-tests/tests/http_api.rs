//! End-to-end tests against a running ordering server.
//!
//! These tests require:
//! - A running ordering server (default: `http://localhost:8000`)
//! - A migrated database behind it
//!
//! Tests cover:
//! - Protected endpoints refuse anonymous requests
//! - The full shop and buyer flow over HTTP
//!
//! # Running
//!
//! ```bash
//! cargo run -p ordering-service &
//! ORDERING_TEST_BASE_URL=http://localhost:8000 \
//!     cargo test -p ordering-integration-tests --test http_api -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use ordering_integration_tests::{CatalogNames, TEST_PASSWORD, catalog_yaml};

fn base_url() -> String {
    std::env::var("ORDERING_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}

/// Register an account and log the returned client in.
async fn logged_in(role: &str) -> (reqwest::Client, String) {
    let client = client();
    let email = format!("{role}-{}@example.com", uuid::Uuid::new_v4());
    let credentials = json!({ "email": email, "password": TEST_PASSWORD });

    let mut register = credentials.clone();
    register["role"] = json!(role);
    let response = client
        .post(format!("{}/auth/register", base_url()))
        .json(&register)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/auth/login", base_url()))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    (client, email)
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[ignore = "Requires running ordering server"]
async fn test_anonymous_requests_are_refused() {
    let client = client();
    for path in ["/basket", "/order", "/contact", "/partner/state"] {
        let response = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "error");
    }
}

#[tokio::test]
#[ignore = "Requires running ordering server"]
async fn test_logout_ends_session() {
    let (client, email) = logged_in("buyer").await;

    let me: Value = client
        .get(format!("{}/auth/me", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], email);

    let response = client
        .post(format!("{}/auth/logout", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/auth/me", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Ordering Flow
// ============================================================================

#[tokio::test]
#[ignore = "Requires running ordering server"]
async fn test_import_order_and_confirm() {
    let base = base_url();
    let names = CatalogNames::unique();
    let (shop, _) = logged_in("shop").await;
    let (buyer, _) = logged_in("buyer").await;

    // Shop uploads its catalog
    let form = Form::new().part(
        "file",
        Part::text(catalog_yaml(&names)).file_name("shop1.yaml"),
    );
    let response = shop
        .post(format!("{base}/goods-import"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let summary: Value = response.json().await.unwrap();
    assert_eq!(summary["status"], "success");
    assert_eq!(summary["goods"], 1);
    let shop_id = summary["shop_id"].as_i64().unwrap();

    // Buyer finds the listing
    let listings: Value = buyer
        .get(format!("{base}/products?shop_id={shop_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listing_id = listings[0]["id"].as_i64().unwrap();

    // Adding twice keeps one line with the latest quantity
    for quantity in [2, 3] {
        let response = buyer
            .post(format!("{base}/basket/items"))
            .json(&json!({ "product_info_id": listing_id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let line: Value = response.json().await.unwrap();
        assert_eq!(line["quantity"], quantity);
    }
    let basket: Value = buyer
        .get(format!("{base}/basket"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(basket["items"].as_array().unwrap().len(), 1);
    assert_eq!(decimal(&basket["total"]), Decimal::from(1500));
    let order_id = basket["order_id"].as_i64().unwrap();

    // Contact, then placement
    let response = buyer
        .post(format!("{base}/contact"))
        .json(&json!({ "phone": "+7 900 111-22-33" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let contact: Value = response.json().await.unwrap();

    let response = buyer
        .post(format!("{base}/order"))
        .json(&json!({ "order_id": order_id, "contact_id": contact["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let placed: Value = response.json().await.unwrap();
    assert_eq!(placed["status"], "new");

    // Shop confirms
    let response = shop
        .patch(format!("{base}/partner/orders/{order_id}"))
        .json(&json!({ "status": "confirmed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let order: Value = buyer
        .get(format!("{base}/order/{order_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["status"], "confirmed");
    assert_eq!(decimal(&order["total"]), Decimal::from(1500));
}
