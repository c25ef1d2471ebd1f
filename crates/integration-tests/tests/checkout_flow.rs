//! End-to-end flows against a real database.
//!
//! Run with `DATABASE_URL` pointing at a disposable database:
//! `cargo test -p zolar-integration-tests -- --include-ignored`

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use zolar_core::{AdminRole, Email, Price, ProductId, Slug, VariantId};
use zolar_db::admin_users::{generate_token, hash_token};
use zolar_db::products::{NewProduct, NewVariant};
use zolar_db::{AdminUserRepository, ProductRepository};
use zolar_integration_tests::{
    TestResponse, admin_app, database_pool, get, json_request, send, storefront_app, with_bearer,
};

/// Create an active product with one variant priced at 200.
async fn create_product(pool: &PgPool, stock: i32) -> (ProductId, VariantId) {
    create_priced_product(pool, stock, "200").await
}

async fn create_priced_product(pool: &PgPool, stock: i32, price: &str) -> (ProductId, VariantId) {
    let tag = Uuid::new_v4().simple().to_string();
    let repo = ProductRepository::new(pool);
    let product = repo
        .create(&NewProduct {
            slug: Slug::parse(&format!("test-tee-{tag}")).unwrap(),
            name: "Test Tee".to_string(),
            description: String::new(),
            category: "t-shirts".to_string(),
            base_price: Price::parse(price).unwrap(),
            images: Vec::new(),
            is_active: true,
            is_featured: false,
        })
        .await
        .unwrap();
    let variant = repo
        .create_variant(
            product.id,
            &NewVariant {
                sku: format!("TEST-{tag}"),
                color: Some("black".to_string()),
                size: Some("M".to_string()),
                price: Price::parse(price).unwrap(),
                stock,
            },
        )
        .await
        .unwrap();
    (product.id, variant.id)
}

async fn create_admin(pool: &PgPool, role: AdminRole) -> String {
    let token = generate_token();
    let email = Email::parse(&format!("admin-{}@zolar.test", Uuid::new_v4().simple())).unwrap();
    AdminUserRepository::new(pool)
        .create(&email, "Test Admin", role, &hash_token(&token))
        .await
        .unwrap();
    token
}

fn checkout_body(email: &str, variant_id: VariantId, quantity: u32) -> serde_json::Value {
    json!({
        "name": "Laila Hassan",
        "email": email,
        "phone": "+20 100 123 4567",
        "address": "12 Nile St",
        "city": "Cairo",
        "items": [{ "variant_id": variant_id, "quantity": quantity }]
    })
}

fn shopper_email() -> String {
    format!("shopper-{}@example.com", Uuid::new_v4().simple())
}

async fn place_order(
    pool: &PgPool,
    email: &str,
    variant_id: VariantId,
    quantity: u32,
) -> TestResponse {
    send(
        storefront_app(pool.clone()),
        json_request(
            "POST",
            "/api/checkout/cod",
            &checkout_body(email, variant_id, quantity),
        ),
    )
    .await
}

/// The admin view of the customer with `email`.
async fn customer_by_email(pool: &PgPool, token: &str, email: &str) -> Value {
    let response = send(
        admin_app(pool.clone()),
        with_bearer(get(&format!("/api/admin/customers?q={email}")), token),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let listing = response.json();
    assert_eq!(listing["total"], 1);
    listing["items"][0].clone()
}

async fn set_order_status(
    pool: &PgPool,
    token: &str,
    order_id: i64,
    status: &str,
) -> TestResponse {
    send(
        admin_app(pool.clone()),
        with_bearer(
            json_request(
                "PATCH",
                &format!("/api/admin/orders/{order_id}/status"),
                &json!({ "status": status }),
            ),
            token,
        ),
    )
    .await
}

async fn order_id_of(pool: &PgPool, token: &str, order_number: &str) -> i64 {
    let listing = send(
        admin_app(pool.clone()),
        with_bearer(get(&format!("/api/admin/orders?q={order_number}")), token),
    )
    .await
    .json();
    listing["items"][0]["id"].as_i64().unwrap()
}

async fn stock_of(pool: &PgPool, product_id: ProductId) -> i32 {
    ProductRepository::new(pool)
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .variants[0]
        .stock
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cod_checkout_decrements_stock_and_is_retrievable() {
    let pool = database_pool().await;
    let (product_id, variant_id) = create_product(&pool, 3).await;
    let email = format!("shopper-{}@example.com", Uuid::new_v4().simple());

    let quote = send(
        storefront_app(pool.clone()),
        json_request(
            "POST",
            "/api/cart/quote",
            &json!({ "items": [{ "variant_id": variant_id, "quantity": 2 }] }),
        ),
    )
    .await;
    assert_eq!(quote.status, StatusCode::OK);
    assert_eq!(quote.json()["quote"]["total"], "450.00");
    assert_eq!(quote.json()["quote"]["orderable"], true);

    let placed = send(
        storefront_app(pool.clone()),
        json_request("POST", "/api/checkout/cod", &checkout_body(&email, variant_id, 2)),
    )
    .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    let confirmation = placed.json();
    assert_eq!(confirmation["status"], "pending");
    assert_eq!(confirmation["payment_method"], "cod");
    assert_eq!(confirmation["total"], "450.00");
    assert_eq!(stock_of(&pool, product_id).await, 1);

    let order_number = confirmation["order_number"].as_str().unwrap();
    let lookup = send(
        storefront_app(pool.clone()),
        get(&format!("/api/orders/{order_number}?email={email}")),
    )
    .await;
    assert_eq!(lookup.status, StatusCode::OK);
    assert_eq!(lookup.json()["items"][0]["quantity"], 2);

    let wrong_email = send(
        storefront_app(pool.clone()),
        get(&format!("/api/orders/{order_number}?email=someone@example.com")),
    )
    .await;
    assert_eq!(wrong_email.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_rejects_more_than_stock() {
    let pool = database_pool().await;
    let (product_id, variant_id) = create_product(&pool, 1).await;
    let email = format!("shopper-{}@example.com", Uuid::new_v4().simple());

    let response = send(
        storefront_app(pool.clone()),
        json_request("POST", "/api/checkout/cod", &checkout_body(&email, variant_id, 2)),
    )
    .await;
    assert!(response.status.is_client_error(), "{}", response.text());
    assert_eq!(stock_of(&pool, product_id).await, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_newsletter_subscribe_is_idempotent() {
    let pool = database_pool().await;
    let email = format!("reader-{}@example.com", Uuid::new_v4().simple());
    let body = json!({ "email": email, "source": "footer" });

    let first = send(
        storefront_app(pool.clone()),
        json_request("POST", "/api/newsletter", &body),
    )
    .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = send(
        storefront_app(pool.clone()),
        json_request("POST", "/api/newsletter", &body),
    )
    .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.json()["status"], "already_subscribed");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_manages_placed_order() {
    let pool = database_pool().await;
    let (_, variant_id) = create_product(&pool, 5).await;
    let email = format!("shopper-{}@example.com", Uuid::new_v4().simple());

    let placed = send(
        storefront_app(pool.clone()),
        json_request("POST", "/api/checkout/cod", &checkout_body(&email, variant_id, 1)),
    )
    .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    let order_number = placed.json()["order_number"].as_str().unwrap().to_string();

    let token = create_admin(&pool, AdminRole::Admin).await;
    let listing = send(
        admin_app(pool.clone()),
        with_bearer(get(&format!("/api/admin/orders?q={order_number}")), &token),
    )
    .await;
    assert_eq!(listing.status, StatusCode::OK);
    let listing = listing.json();
    assert_eq!(listing["total"], 1);
    let order_id = listing["items"][0]["id"].as_i64().unwrap();

    let confirmed = send(
        admin_app(pool.clone()),
        with_bearer(
            json_request(
                "PATCH",
                &format!("/api/admin/orders/{order_id}/status"),
                &json!({ "status": "confirmed" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(confirmed.status, StatusCode::OK, "{}", confirmed.text());
    assert_eq!(confirmed.json()["status"], "confirmed");

    // Confirmed orders cannot go back to pending.
    let backwards = send(
        admin_app(pool.clone()),
        with_bearer(
            json_request(
                "PATCH",
                &format!("/api/admin/orders/{order_id}/status"),
                &json!({ "status": "pending" }),
            ),
            &token,
        ),
    )
    .await;
    assert!(backwards.status.is_client_error());

    let viewer = create_admin(&pool, AdminRole::Viewer).await;
    let forbidden = send(
        admin_app(pool.clone()),
        with_bearer(
            json_request(
                "PATCH",
                &format!("/api/admin/orders/{order_id}/status"),
                &json!({ "status": "shipped" }),
            ),
            &viewer,
        ),
    )
    .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_token_lifecycle() {
    let pool = database_pool().await;
    let super_admin = create_admin(&pool, AdminRole::SuperAdmin).await;

    let me = send(
        admin_app(pool.clone()),
        with_bearer(get("/api/admin/me"), &super_admin),
    )
    .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["role"], "super_admin");

    let created = send(
        admin_app(pool.clone()),
        with_bearer(
            json_request(
                "POST",
                "/api/admin/users",
                &json!({
                    "email": format!("new-{}@zolar.test", Uuid::new_v4().simple()),
                    "name": "New Admin",
                    "role": "viewer"
                }),
            ),
            &super_admin,
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());
    let new_token = created.json()["token"].as_str().unwrap().to_string();

    let as_new = send(
        admin_app(pool.clone()),
        with_bearer(get("/api/admin/me"), &new_token),
    )
    .await;
    assert_eq!(as_new.status, StatusCode::OK);
    assert_eq!(as_new.json()["role"], "viewer");

    let users_as_viewer = send(
        admin_app(pool.clone()),
        with_bearer(get("/api/admin/users"), &new_token),
    )
    .await;
    assert_eq!(users_as_viewer.status, StatusCode::FORBIDDEN);

    let bogus = send(
        admin_app(pool),
        with_bearer(get("/api/admin/me"), "not-a-real-token"),
    )
    .await;
    assert_eq!(bogus.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_customer_tier_progresses_with_orders() {
    let pool = database_pool().await;
    let token = create_admin(&pool, AdminRole::Admin).await;
    let (_, variant_id) = create_product(&pool, 20).await;
    let email = shopper_email();

    let placed = place_order(&pool, &email, variant_id, 1).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    let customer = customer_by_email(&pool, &token, &email).await;
    assert_eq!(customer["tier"], "regular");
    assert_eq!(customer["total_orders"], 1);

    for _ in 0..2 {
        let placed = place_order(&pool, &email, variant_id, 1).await;
        assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    }
    let customer = customer_by_email(&pool, &token, &email).await;
    assert_eq!(customer["tier"], "loyal");
    assert_eq!(customer["total_orders"], 3);
    assert_eq!(customer["total_spent"], "750.00");

    // A single order at the spend threshold is enough for VIP.
    let (_, pricey) = create_priced_product(&pool, 5, "25000").await;
    let big_spender = shopper_email();
    let placed = place_order(&pool, &big_spender, pricey, 2).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    let customer = customer_by_email(&pool, &token, &big_spender).await;
    assert_eq!(customer["total_orders"], 1);
    assert_eq!(customer["tier"], "vip");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancelling_order_restocks_and_reverts_customer_stats() {
    let pool = database_pool().await;
    let token = create_admin(&pool, AdminRole::Admin).await;
    let (product_id, variant_id) = create_product(&pool, 5).await;
    let email = shopper_email();

    let placed = place_order(&pool, &email, variant_id, 2).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    assert_eq!(stock_of(&pool, product_id).await, 3);
    let order_number = placed.json()["order_number"].as_str().unwrap().to_string();
    let order_id = order_id_of(&pool, &token, &order_number).await;

    let cancelled = set_order_status(&pool, &token, order_id, "cancelled").await;
    assert_eq!(cancelled.status, StatusCode::OK, "{}", cancelled.text());
    assert_eq!(cancelled.json()["status"], "cancelled");
    assert_eq!(stock_of(&pool, product_id).await, 5);

    let customer = customer_by_email(&pool, &token, &email).await;
    assert_eq!(customer["total_orders"], 0);
    assert_eq!(customer["total_spent"], "0.00");
    assert_eq!(customer["tier"], "new");

    // Cancelled is final, and stock is not returned twice.
    let again = set_order_status(&pool, &token, order_id, "cancelled").await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.error_message(), "order is already cancelled");
    assert_eq!(stock_of(&pool, product_id).await, 5);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_checkouts_for_last_unit() {
    let pool = database_pool().await;
    let (product_id, variant_id) = create_product(&pool, 1).await;
    let (first_email, second_email) = (shopper_email(), shopper_email());

    let (first, second) = tokio::join!(
        place_order(&pool, &first_email, variant_id, 1),
        place_order(&pool, &second_email, variant_id, 1),
    );

    let mut statuses = [first.status, second.status];
    statuses.sort_by_key(StatusCode::as_u16);
    // The loser either sees the locked stock at zero (400) or loses the
    // conditional decrement (409).
    assert_eq!(statuses[0], StatusCode::CREATED);
    assert!(statuses[1].is_client_error(), "{statuses:?}");
    assert_eq!(stock_of(&pool, product_id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancel_and_checkout_on_same_variant_both_succeed() {
    let pool = database_pool().await;
    let token = create_admin(&pool, AdminRole::Admin).await;
    let (product_id, variant_id) = create_product(&pool, 4).await;

    let placed = place_order(&pool, &shopper_email(), variant_id, 2).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    let order_number = placed.json()["order_number"].as_str().unwrap().to_string();
    let order_id = order_id_of(&pool, &token, &order_number).await;

    let second_email = shopper_email();
    let (cancelled, second) = tokio::join!(
        set_order_status(&pool, &token, order_id, "cancelled"),
        place_order(&pool, &second_email, variant_id, 2),
    );
    assert_eq!(cancelled.status, StatusCode::OK, "{}", cancelled.text());
    assert_eq!(second.status, StatusCode::CREATED, "{}", second.text());
    assert_eq!(stock_of(&pool, product_id).await, 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_stock_adjustment_limits() {
    let pool = database_pool().await;
    let token = create_admin(&pool, AdminRole::Admin).await;
    let (product_id, variant_id) = create_product(&pool, 3).await;
    let adjust = |delta: Value| {
        with_bearer(
            json_request(
                "POST",
                &format!("/api/admin/variants/{variant_id}/stock"),
                &json!({ "delta": delta, "reason": "recount" }),
            ),
            &token,
        )
    };

    let negative = send(admin_app(pool.clone()), adjust(json!(-10))).await;
    assert_eq!(negative.status, StatusCode::CONFLICT);
    assert!(negative.error_message().contains("negative"));

    let huge = send(admin_app(pool.clone()), adjust(json!(2_000_000_000))).await;
    assert_eq!(huge.status, StatusCode::BAD_REQUEST);

    let malformed = send(admin_app(pool.clone()), adjust(json!("lots"))).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert!(malformed.error_message().contains("delta"));

    assert_eq!(stock_of(&pool, product_id).await, 3);

    let restocked = send(admin_app(pool.clone()), adjust(json!(4))).await;
    assert_eq!(restocked.status, StatusCode::OK, "{}", restocked.text());
    assert_eq!(restocked.json()["stock"], 7);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_write_is_recorded_in_activity_feed() {
    let pool = database_pool().await;
    let token = create_admin(&pool, AdminRole::Admin).await;
    let me = send(admin_app(pool.clone()), with_bearer(get("/api/admin/me"), &token))
        .await
        .json();
    let admin_email = me["email"].as_str().unwrap().to_string();
    let (_, variant_id) = create_product(&pool, 3).await;

    let adjusted = send(
        admin_app(pool.clone()),
        with_bearer(
            json_request(
                "POST",
                &format!("/api/admin/variants/{variant_id}/stock"),
                &json!({ "delta": 2, "reason": "delivery" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(adjusted.status, StatusCode::OK, "{}", adjusted.text());

    // The audit insert runs in the background.
    let mut recorded = Vec::new();
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let feed = send(
            admin_app(pool.clone()),
            with_bearer(get("/api/admin/activity?limit=200"), &token),
        )
        .await
        .json();
        recorded = feed["actions"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|a| a["admin_email"] == admin_email.as_str())
            .cloned()
            .collect();
        if !recorded.is_empty() {
            break;
        }
    }

    assert_eq!(recorded.len(), 1, "{recorded:?}");
    let action = &recorded[0];
    assert_eq!(action["action"], "variant.stock");
    assert_eq!(action["entity_type"], "variant");
    assert_eq!(action["entity_id"], variant_id.to_string());
    assert_eq!(action["details"]["delta"], 2);
    assert_eq!(action["details"]["stock"], 5);
}
