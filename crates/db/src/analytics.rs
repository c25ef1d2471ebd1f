//! Read-only aggregates for the admin dashboard.
//!
//! Revenue figures exclude cancelled orders.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use zolar_core::OrderStatus;

use super::RepositoryError;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardTotals {
    pub revenue_total: Decimal,
    pub revenue_today: Decimal,
    pub orders_total: i64,
    pub orders_today: i64,
    pub average_order_value: Decimal,
    pub customers_total: i64,
    pub subscribers_active: i64,
}

/// Order count for one status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// One day of the sales series.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub day: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

/// A best-selling product over a period.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_name: String,
    pub units: i64,
    pub revenue: Decimal,
}

/// Dashboard headline totals. "Today" is the current UTC day.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
#[instrument(skip(pool))]
pub async fn dashboard_totals(pool: &PgPool) -> Result<DashboardTotals, RepositoryError> {
    let totals = sqlx::query_as::<_, DashboardTotals>(
        r"
        SELECT
            COALESCE(SUM(total) FILTER (WHERE status <> 'cancelled'), 0) AS revenue_total,
            COALESCE(SUM(total) FILTER (
                WHERE status <> 'cancelled' AND created_at >= date_trunc('day', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC'
            ), 0) AS revenue_today,
            COUNT(*) AS orders_total,
            COUNT(*) FILTER (
                WHERE created_at >= date_trunc('day', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC'
            ) AS orders_today,
            COALESCE(ROUND(AVG(total) FILTER (WHERE status <> 'cancelled'), 2), 0) AS average_order_value,
            (SELECT COUNT(*) FROM customer) AS customers_total,
            (SELECT COUNT(*) FROM newsletter_subscriber WHERE unsubscribed_at IS NULL) AS subscribers_active
        FROM customer_order
        ",
    )
    .fetch_one(pool)
    .await?;
    Ok(totals)
}

/// Order counts per status. Statuses with no orders are omitted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn orders_by_status(pool: &PgPool) -> Result<Vec<StatusCount>, RepositoryError> {
    let counts = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM customer_order GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await?;
    Ok(counts)
}

/// Daily orders and revenue for the last `days` days, today included.
/// Days without orders are present with zeros.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
#[instrument(skip(pool))]
pub async fn daily_sales(pool: &PgPool, days: i32) -> Result<Vec<DailySales>, RepositoryError> {
    let series = sqlx::query_as::<_, DailySales>(
        r"
        WITH days AS (
            SELECT generate_series(
                (NOW() AT TIME ZONE 'UTC')::date - ($1 - 1),
                (NOW() AT TIME ZONE 'UTC')::date,
                INTERVAL '1 day'
            )::date AS day
        )
        SELECT d.day,
               COUNT(o.id) AS orders,
               COALESCE(SUM(o.total), 0) AS revenue
        FROM days d
        LEFT JOIN customer_order o
               ON (o.created_at AT TIME ZONE 'UTC')::date = d.day
              AND o.status <> 'cancelled'
        GROUP BY d.day
        ORDER BY d.day
        ",
    )
    .bind(days)
    .fetch_all(pool)
    .await?;
    Ok(series)
}

/// Best-selling products by units since `since`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn top_products(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<TopProduct>, RepositoryError> {
    let products = sqlx::query_as::<_, TopProduct>(
        r"
        SELECT i.product_name,
               SUM(i.quantity)::bigint AS units,
               SUM(i.line_total) AS revenue
        FROM order_item i
        JOIN customer_order o ON o.id = i.order_id
        WHERE o.created_at >= $1 AND o.status <> 'cancelled'
        GROUP BY i.product_name
        ORDER BY units DESC, revenue DESC
        LIMIT $2
        ",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(products)
}
