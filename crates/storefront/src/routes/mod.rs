//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/products                  - Product listing (?category=&q=&featured=&page=&per_page=)
//! GET  /api/products/{slug}           - Product detail with variants
//! GET  /api/categories                - Categories of active products
//!
//! # Content
//! GET  /api/content/hero              - Hero carousel
//! GET  /api/content/archive           - Archive collections
//! GET  /api/content/archive/{slug}    - Archive collection with products
//! GET  /api/content/social            - Social links
//! GET  /api/tracking                  - Tracking pixel IDs
//!
//! # Cart & checkout (rate limited)
//! POST /api/cart/quote                - Price a browser-held cart
//! POST /api/checkout/cod              - Place a cash-on-delivery order
//! GET  /api/orders/{order_number}     - Order lookup (?email=)
//! POST /api/newsletter                - Newsletter signup
//! ```

pub mod cart;
pub mod checkout;
pub mod content;
pub mod newsletter;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Catalog and content read routes.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(products::categories))
        .route("/content/hero", get(content::hero))
        .route("/content/archive", get(content::archive_index))
        .route("/content/archive/{slug}", get(content::archive_show))
        .route("/content/social", get(content::social))
        .route("/tracking", get(content::tracking))
        .route("/cart/quote", post(cart::quote))
        .route("/orders/{order_number}", get(orders::show))
}

/// Write routes that need strict rate limiting.
pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/cod", post(checkout::cod))
        .route("/newsletter", post(newsletter::subscribe))
}

/// Create all API routes for the storefront, mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/api",
        catalog_routes()
            .layer(api_rate_limiter())
            .merge(write_routes().layer(checkout_rate_limiter())),
    )
}
