//! HTTP route handlers for admin.
//!
//! Every route requires `Authorization: Bearer <token>`. Reads accept any
//! admin; writes need `admin` or `super_admin`; `/users` needs `super_admin`.
//!
//! # Route Structure
//!
//! ```text
//! GET    /api/admin/me                        - Current admin
//! GET    /api/admin/dashboard                 - Totals, low stock, recent orders
//! GET    /api/admin/analytics/sales           - Daily series and top products (?days=)
//!
//! # Catalog
//! GET    /api/admin/products                  - Product listing (?category=&q=&page=&per_page=)
//! POST   /api/admin/products                  - Create product
//! GET    /api/admin/products/{id}             - Product with variants
//! PATCH  /api/admin/products/{id}             - Update product
//! DELETE /api/admin/products/{id}             - Delete product
//! POST   /api/admin/products/{id}/variants    - Create variant
//! PATCH  /api/admin/variants/{id}             - Update variant
//! DELETE /api/admin/variants/{id}             - Delete variant
//! POST   /api/admin/variants/{id}/stock       - Adjust stock by a delta
//!
//! # Orders & customers
//! GET    /api/admin/orders                    - Order listing (?status=&q=&page=)
//! GET    /api/admin/orders/{id}               - Order with items
//! PATCH  /api/admin/orders/{id}/status        - Status transition
//! GET    /api/admin/customers                 - Customer listing (?tier=&q=&page=)
//! GET    /api/admin/customers/{id}            - Customer with orders
//! PATCH  /api/admin/customers/{id}            - Edit notes
//!
//! # Content
//! GET|POST       /api/admin/content/hero
//! POST           /api/admin/content/hero/reorder
//! PATCH|DELETE   /api/admin/content/hero/{id}
//! GET|POST       /api/admin/content/archive
//! PATCH|DELETE   /api/admin/content/archive/{id}
//! GET|POST       /api/admin/content/social
//! PATCH|DELETE   /api/admin/content/social/{id}
//!
//! # Other
//! GET    /api/admin/newsletter                - Subscribers (?active=&page=)
//! DELETE /api/admin/newsletter/{id}           - Unsubscribe
//! POST   /api/admin/media                     - Image upload (multipart `file`)
//! GET    /api/admin/activity                  - Admin action feed (?limit=)
//! GET    /api/admin/users                     - Admin users (super admin)
//! POST   /api/admin/users                     - Create admin, returns one-time token
//! DELETE /api/admin/users/{id}                - Remove admin
//! ```

pub mod activity;
pub mod analytics;
pub mod content;
pub mod customers;
pub mod dashboard;
pub mod media;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};
use serde::Serialize;

use crate::state::AppState;

/// Maximum page size for admin listings.
pub const MAX_PER_PAGE: u32 = 100;

/// A page of results with the total count.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Paginated<T> {
    /// Wrap a page of rows fetched with [`page_bounds`].
    #[must_use]
    pub fn new(items: Vec<T>, page: Option<u32>, limit: i64, total: i64) -> Self {
        Self {
            items,
            page: page.unwrap_or(1).max(1),
            per_page: u32::try_from(limit).unwrap_or(MAX_PER_PAGE),
            total,
        }
    }
}

/// Clamp pagination parameters for admin listings.
#[must_use]
pub fn page_bounds(page: Option<u32>, per_page: Option<u32>) -> (i64, i64) {
    zolar_db::page_bounds(page, per_page, MAX_PER_PAGE)
}

/// Trim a free-text search parameter, dropping it when blank.
#[must_use]
pub fn search_term(q: Option<String>) -> Option<String> {
    q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty())
}

/// Create all admin API routes, mounted under `/api/admin`.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route("/me", get(users::me))
        .route("/dashboard", get(dashboard::index))
        .route("/analytics/sales", get(analytics::sales))
        // Catalog
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
        .route("/products/{id}/variants", post(products::create_variant))
        .route(
            "/variants/{id}",
            patch(products::update_variant).delete(products::delete_variant),
        )
        .route("/variants/{id}/stock", post(products::adjust_stock))
        // Orders and customers
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/customers", get(customers::index))
        .route(
            "/customers/{id}",
            get(customers::show).patch(customers::update),
        )
        // Content
        .route(
            "/content/hero",
            get(content::hero_index).post(content::hero_create),
        )
        .route("/content/hero/reorder", post(content::hero_reorder))
        .route(
            "/content/hero/{id}",
            patch(content::hero_update).delete(content::hero_delete),
        )
        .route(
            "/content/archive",
            get(content::archive_index).post(content::archive_create),
        )
        .route(
            "/content/archive/{id}",
            patch(content::archive_update).delete(content::archive_delete),
        )
        .route(
            "/content/social",
            get(content::social_index).post(content::social_create),
        )
        .route(
            "/content/social/{id}",
            patch(content::social_update).delete(content::social_delete),
        )
        // Newsletter, media, activity
        .route("/newsletter", get(newsletter::index))
        .route("/newsletter/{id}", delete(newsletter::unsubscribe))
        .route(
            "/media",
            post(media::upload).layer(DefaultBodyLimit::max(media::BODY_LIMIT)),
        )
        .route("/activity", get(activity::index))
        // Admin users
        .route("/users", get(users::index).post(users::create))
        .route("/users/{id}", delete(users::delete));

    Router::new().nest("/api/admin", api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_clamped() {
        assert_eq!(page_bounds(None, None), (50, 0));
        assert_eq!(page_bounds(Some(3), Some(20)), (20, 40));
        assert_eq!(page_bounds(Some(1), Some(1000)), (100, 0));
    }

    #[test]
    fn test_search_term() {
        assert_eq!(search_term(Some("  zlr ".to_string())).as_deref(), Some("zlr"));
        assert_eq!(search_term(Some("   ".to_string())), None);
        assert_eq!(search_term(None), None);
    }

    #[test]
    fn test_paginated_meta() {
        let page = Paginated::new(vec![1, 2, 3], Some(0), 25, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 25);
        assert_eq!(page.total, 3);
    }
}
