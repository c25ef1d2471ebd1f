//! Customer repository.
//!
//! Customers are created by checkout, never by hand: the first order for an
//! email inserts the row, later orders refresh the contact details and bump
//! the stats. Tier is recomputed from `total_orders` and `total_spent` every
//! time either changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use zolar_core::{CustomerId, CustomerTier, Email, Price};

use super::RepositoryError;

const CUSTOMER_COLUMNS: &str = "id, email, name, phone, address, city, total_orders, \
     total_spent, tier, notes, first_order_at, last_order_at, created_at, updated_at";

/// A customer, keyed by normalized email.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub total_orders: i32,
    pub total_spent: Price,
    pub tier: CustomerTier,
    pub notes: Option<String>,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact details captured at checkout.
#[derive(Debug, Clone)]
pub struct CustomerContact<'a> {
    pub email: &'a Email,
    pub name: &'a str,
    pub phone: &'a str,
    pub address: &'a str,
    pub city: &'a str,
}

/// Customer list filter.
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub tier: Option<CustomerTier>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Insert the customer for `contact.email`, or refresh the contact details
/// of the existing row. Returns the customer ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn upsert_for_checkout(
    conn: &mut PgConnection,
    contact: &CustomerContact<'_>,
) -> Result<CustomerId, RepositoryError> {
    let (id,): (CustomerId,) = sqlx::query_as(
        r"
        INSERT INTO customer (email, name, phone, address, city)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET
            name = EXCLUDED.name,
            phone = EXCLUDED.phone,
            address = EXCLUDED.address,
            city = EXCLUDED.city,
            updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(contact.email)
    .bind(contact.name)
    .bind(contact.phone)
    .bind(contact.address)
    .bind(contact.city)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Apply an order to the customer's stats: `orders` is `1` for a new order
/// and `-1` when one is cancelled, `amount` is the order total.
///
/// Returns the tier after the change.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the customer does not exist.
pub async fn record_order(
    conn: &mut PgConnection,
    id: CustomerId,
    orders: i32,
    amount: Decimal,
) -> Result<CustomerTier, RepositoryError> {
    let (total_orders, total_spent): (i32, Decimal) = sqlx::query_as(
        r"
        UPDATE customer SET
            total_orders = GREATEST(total_orders + $2, 0),
            total_spent = GREATEST(total_spent + $3, 0),
            first_order_at = CASE WHEN $2 > 0 THEN COALESCE(first_order_at, NOW()) ELSE first_order_at END,
            last_order_at = CASE WHEN $2 > 0 THEN NOW() ELSE last_order_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING total_orders, total_spent
        ",
    )
    .bind(id)
    .bind(orders)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    let tier = CustomerTier::for_history(total_orders, total_spent);
    sqlx::query("UPDATE customer SET tier = $2 WHERE id = $1 AND tier <> $2")
        .bind(id)
        .bind(tier)
        .execute(conn)
        .await?;
    Ok(tier)
}

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List customers, most recent buyers first. Returns the page and the
    /// total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &CustomerFilter,
    ) -> Result<(Vec<Customer>, i64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::customer_tier IS NULL OR tier = $1)
              AND ($2::text IS NULL OR email ILIKE '%' || $2 || '%'
                   OR name ILIKE '%' || $2 || '%' OR phone LIKE '%' || $2 || '%')
        ";

        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer {WHERE} \
             ORDER BY last_order_at DESC NULLS LAST, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.tier)
        .bind(filter.search.as_deref())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM customer {WHERE}"))
            .bind(filter.tier)
            .bind(filter.search.as_deref())
            .fetch_one(self.pool)
            .await?;

        Ok((customers, total))
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(customer)
    }

    /// Replace the admin notes on a customer. `None` clears them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn update_notes(
        &self,
        id: CustomerId,
        notes: Option<&str>,
    ) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            "UPDATE customer SET notes = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id)
        .bind(notes)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Number of customers in each tier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tier_counts(&self) -> Result<Vec<(CustomerTier, i64)>, RepositoryError> {
        let rows: Vec<(CustomerTier, i64)> =
            sqlx::query_as("SELECT tier, COUNT(*) FROM customer GROUP BY tier ORDER BY tier")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }
}
