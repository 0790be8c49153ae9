//! HTTP route handlers for the ordering service.
//!
//! Every endpoint speaks JSON. Errors are `{"status": "error", "message": ...}`
//! (see [`crate::error::AppError`]).
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database reachable)
//!
//! # Auth
//! POST   /auth/register                   - Create a buyer or shop account
//! POST   /auth/login                      - Start a session
//! POST   /auth/logout                     - End the session
//! GET    /auth/me                         - Current account
//!
//! # Catalog
//! GET    /shops                           - Shops accepting orders
//! GET    /categories                      - All categories
//! GET    /products?shop_id&category_id    - Listings
//! GET    /products/{id}                   - Listing with parameters
//! POST   /goods-import                    - Upload a YAML catalog (multipart `file`)
//!
//! # Partner (shop accounts)
//! POST   /partner/update                  - Import a catalog from a URL
//! GET    /partner/state                   - Whether the shop accepts orders
//! POST   /partner/state                   - Open or close the shop
//! GET    /partner/orders                  - Orders containing the shop's goods
//! PATCH  /partner/orders/{id}             - Change order status
//!
//! # Basket (buyer accounts)
//! GET    /basket                          - Open basket with total
//! POST   /basket/items                    - Add or replace a line item
//! PUT    /basket/{order_id}/items/{item_id}
//! DELETE /basket/{order_id}/items/{item_id}
//!
//! # Orders
//! GET    /order                           - Placed orders
//! POST   /order                           - Place the basket
//! GET    /order/{id}                      - Order detail
//!
//! # Contacts
//! GET|POST|PUT|DELETE /contact            - The buyer contact
//! GET|POST /contact/addresses             - Addresses
//! PUT|DELETE /contact/addresses/{id}
//! ```

pub mod auth;
pub mod basket;
pub mod catalog;
pub mod contacts;
pub mod health;
pub mod orders;
pub mod partner;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the partner routes router.
pub fn partner_routes() -> Router<AppState> {
    Router::new()
        .route("/update", post(partner::update))
        .route("/state", get(partner::state).post(partner::set_state))
        .route("/orders", get(partner::orders))
        .route("/orders/{id}", patch(partner::update_order_status))
}

/// Create the basket routes router.
pub fn basket_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(basket::show))
        .route("/items", post(basket::add_item))
        .route(
            "/{order_id}/items/{item_id}",
            put(basket::update_item).delete(basket::remove_item),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/{id}", get(orders::show))
}

/// Create the contact routes router.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(contacts::show)
                .post(contacts::create)
                .put(contacts::update)
                .delete(contacts::delete),
        )
        .route(
            "/addresses",
            get(contacts::addresses).post(contacts::create_address),
        )
        .route(
            "/addresses/{id}",
            put(contacts::update_address).delete(contacts::delete_address),
        )
}

/// Create all routes for the ordering service.
///
/// `import_max_bytes` caps the body of catalog uploads.
pub fn routes(import_max_bytes: usize) -> Router<AppState> {
    Router::new()
        // Health checks
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        // Catalog browsing
        .route("/shops", get(catalog::shops))
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        // Catalog upload
        .route(
            "/goods-import",
            post(catalog::import_goods).layer(DefaultBodyLimit::max(import_max_bytes)),
        )
        .nest("/auth", auth_routes())
        .nest("/partner", partner_routes())
        .nest("/basket", basket_routes())
        .nest("/order", order_routes())
        .nest("/contact", contact_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{
        DEFAULT_IMPORT_MAX_BYTES, DEFAULT_NOTIFICATION_QUEUE_CAPACITY, ServiceConfig,
    };
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::notifications::{LogNotifier, NotificationQueue};

    /// State whose pool points at a port nothing listens on.
    fn offline_state() -> AppState {
        let config = ServiceConfig {
            database_url: SecretString::from("postgres://localhost:1/ordering_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            base_url: "http://localhost:8000".to_string(),
            notification_queue_capacity: DEFAULT_NOTIFICATION_QUEUE_CAPACITY,
            import_max_bytes: DEFAULT_IMPORT_MAX_BYTES,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://localhost:1/ordering_test")
            .unwrap();
        let (notifications, _worker) = NotificationQueue::start(LogNotifier, 4);
        AppState::new(config, pool, notifications).unwrap()
    }

    fn router() -> axum::Router {
        routes(DEFAULT_IMPORT_MAX_BYTES).with_state(offline_state())
    }

    async fn send(app: axum::Router, method: &str, uri: &str) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok_without_database() {
        let response = send(router(), "GET", "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_fails_without_database() {
        let response = send(router(), "GET", "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_protected_routes_require_login() {
        for (method, uri) in [
            ("GET", "/auth/me"),
            ("GET", "/basket"),
            ("DELETE", "/basket/1/items/2"),
            ("GET", "/order"),
            ("GET", "/order/1"),
            ("GET", "/contact"),
            ("GET", "/contact/addresses"),
            ("DELETE", "/contact/addresses/3"),
            ("GET", "/partner/state"),
            ("GET", "/partner/orders"),
        ] {
            let response = send(router(), method, uri).await;
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "{method} {uri} should require login"
            );
        }
    }

    #[tokio::test]
    async fn test_goods_import_requires_login_before_reading_body() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/goods-import")
                    .header("content-type", "multipart/form-data; boundary=X")
                    .body(Body::from("--X--\r\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = send(router(), "GET", "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_app_adds_request_id() {
        let response = send(crate::app(offline_state()), "GET", "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}
