//! Storefront API tests that need no database.
//!
//! The pool points at an unreachable address, so these cover routing,
//! middleware and everything validated before the first query.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use zolar_integration_tests::{
    STOREFRONT_ORIGIN, UNREACHABLE_DATABASE_URL, get, json_request, lazy_pool, preflight, send,
    storefront_app,
};

fn app() -> axum::Router {
    storefront_app(lazy_pool(UNREACHABLE_DATABASE_URL))
}

fn checkout_body(email: &str) -> serde_json::Value {
    json!({
        "name": "Laila Hassan",
        "email": email,
        "phone": "+20 100 123 4567",
        "address": "12 Nile St",
        "city": "Cairo",
        "items": [{ "variant_id": 1, "quantity": 1 }]
    })
}

#[tokio::test]
async fn test_health() {
    let response = send(app(), get("/health")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let response = send(app(), get("/health/ready")).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_security_headers() {
    let response = send(app(), get("/health")).await;
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(response.header("referrer-policy"), Some("no-referrer"));
    assert!(response.header("content-security-policy").is_some());
    assert!(response.header("strict-transport-security").is_some());
}

#[tokio::test]
async fn test_request_id_generated_and_echoed() {
    let response = send(app(), get("/health")).await;
    let generated = response.header("x-request-id").unwrap();
    assert_eq!(generated.len(), 36);

    let mut request = get("/health");
    request
        .headers_mut()
        .insert("x-request-id", "upstream-abc123".parse().unwrap());
    let response = send(app(), request).await;
    assert_eq!(response.header("x-request-id"), Some("upstream-abc123"));
}

#[tokio::test]
async fn test_cors_preflight_allows_storefront_origin() {
    let response = send(
        app(),
        preflight("/api/checkout/cod", STOREFRONT_ORIGIN, "POST", "content-type"),
    )
    .await;
    assert!(response.status.is_success());
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some(STOREFRONT_ORIGIN)
    );
}

#[tokio::test]
async fn test_cors_preflight_rejects_other_origin() {
    let response = send(
        app(),
        preflight("/api/checkout/cod", "https://evil.example", "POST", "content-type"),
    )
    .await;
    assert!(response.header("access-control-allow-origin").is_none());

    let response = send(
        app(),
        preflight(
            "/api/checkout/cod",
            "http://localhost:5173.evil.example",
            "POST",
            "content-type",
        ),
    )
    .await;
    assert!(response.header("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_tracking_ids_from_config() {
    let response = send(app(), get("/api/tracking")).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["ga4_measurement_id"], "G-TEST123");
    assert_eq!(body["meta_pixel_id"], "1234567890");
    assert!(body["tiktok_pixel_id"].is_null());
    assert_eq!(body["currency"], "EGP");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = send(app(), get("/api/nope")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_rejects_invalid_email() {
    let response = send(
        app(),
        json_request("POST", "/api/checkout/cod", &checkout_body("not-an-email")),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error_message().starts_with("Invalid email"));
}

#[tokio::test]
async fn test_checkout_rejects_missing_city() {
    let mut body = checkout_body("laila@example.com");
    body["city"] = json!("   ");
    let response = send(app(), json_request("POST", "/api/checkout/cod", &body)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_message(), "city is required");
}

#[tokio::test]
async fn test_checkout_without_city_field_is_400_json() {
    let mut body = checkout_body("laila@example.com");
    body.as_object_mut().unwrap().remove("city");
    let response = send(app(), json_request("POST", "/api/checkout/cod", &body)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert!(response.error_message().contains("city"));
}

#[tokio::test]
async fn test_checkout_malformed_json_is_400_json() {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/checkout/cod")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\": "))
        .unwrap();
    let response = send(app(), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!response.error_message().is_empty());
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart() {
    let mut body = checkout_body("laila@example.com");
    body["items"] = json!([]);
    let response = send(app(), json_request("POST", "/api/checkout/cod", &body)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_is_rate_limited() {
    let app = app();
    let body = checkout_body("not-an-email");

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let response = send(
            app.clone(),
            json_request("POST", "/api/checkout/cod", &body),
        )
        .await;
        statuses.push(response.status);
    }

    assert!(statuses[..5].iter().all(|s| *s == StatusCode::BAD_REQUEST));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_cart_quote_rejects_empty_cart() {
    let response = send(
        app(),
        json_request("POST", "/api/cart/quote", &json!({ "items": [] })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_quote_rejects_zero_quantity() {
    let response = send(
        app(),
        json_request(
            "POST",
            "/api/cart/quote",
            &json!({ "items": [{ "variant_id": 3, "quantity": 0 }] }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_quote_rejects_negative_quantity() {
    let response = send(
        app(),
        json_request(
            "POST",
            "/api/cart/quote",
            &json!({ "items": [{ "variant_id": 3, "quantity": -1 }] }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert!(response.error_message().contains("quantity"));
}

#[tokio::test]
async fn test_newsletter_rejects_invalid_email() {
    let response = send(
        app(),
        json_request("POST", "/api/newsletter", &json!({ "email": "nope" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error_message(),
        "Please enter a valid email address."
    );
}

#[tokio::test]
async fn test_order_lookup_rejects_invalid_email() {
    let response = send(app(), get("/api/orders/ZLR-260301-A1B2C3?email=nope")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_lookup_without_email_is_400_json() {
    let response = send(app(), get("/api/orders/ZLR-260301-A1B2C3")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error_message().contains("email"));
}

#[tokio::test]
async fn test_product_list_bad_query_is_400_json() {
    let response = send(app(), get("/api/products?page=first")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_catalog_read_without_database_is_500() {
    let response = send(app(), get("/api/content/social")).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_message(), "Internal server error");
}
