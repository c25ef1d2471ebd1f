//! Database layer for ZOLAR.
//!
//! # Database: `zolar`
//!
//! The storefront and the admin dashboard share one `PostgreSQL` database.
//! The storefront only reads the catalog and content and writes orders,
//! customers and newsletter subscribers; everything else is admin-owned.
//!
//! ## Tables
//!
//! - `product`, `variant` - Catalog (variants carry price and stock)
//! - `customer` - One row per email, with order stats and loyalty tier
//! - `customer_order`, `order_item` - Cash-on-delivery orders
//! - `admin_user`, `admin_action` - Admin accounts and the audit log
//! - `hero_slide`, `archive_collection`, `social_link` - Storefront content
//! - `newsletter_subscriber` - Newsletter capture
//!
//! # Migrations
//!
//! Migrations live in `crates/db/migrations/`, are embedded in [`MIGRATOR`],
//! and run via:
//! ```bash
//! cargo run -p zolar-cli -- migrate
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin_actions;
pub mod admin_users;
pub mod analytics;
pub mod content;
pub mod customers;
pub mod newsletter;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use content::ContentRepository;
pub use customers::CustomerRepository;
pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate SKU) or invalid state change.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique-constraint violations to `Conflict` with the given message.
    pub(crate) fn unique_violation(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Clamp user-supplied pagination to sane bounds.
///
/// Pages are 1-based. Returns `(limit, offset)` ready to bind.
#[must_use]
pub fn page_bounds(page: Option<u32>, per_page: Option<u32>, max_per_page: u32) -> (i64, i64) {
    let per_page = per_page.unwrap_or(max_per_page / 2).clamp(1, max_per_page);
    let page = page.unwrap_or(1).max(1);
    let limit = i64::from(per_page);
    (limit, i64::from(page - 1) * limit)
}
