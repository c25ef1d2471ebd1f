//! Dashboard overview.

use axum::{extract::State, response::IntoResponse};
use serde::Serialize;
use tracing::instrument;

use zolar_core::CustomerTier;
use zolar_db::analytics::{self, DashboardTotals, StatusCount};
use zolar_db::orders::{Order, OrderFilter};
use zolar_db::products::LowStockVariant;
use zolar_db::{CustomerRepository, OrderRepository, ProductRepository};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const LOW_STOCK_LIMIT: i64 = 20;
const RECENT_ORDERS: i64 = 10;

/// Customers in one tier.
#[derive(Debug, Serialize)]
pub struct TierCount {
    pub tier: CustomerTier,
    pub count: i64,
}

/// Dashboard payload.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub totals: DashboardTotals,
    pub orders_by_status: Vec<StatusCount>,
    pub customers_by_tier: Vec<TierCount>,
    pub low_stock_threshold: i32,
    pub low_stock: Vec<LowStockVariant>,
    pub recent_orders: Vec<Order>,
}

/// Headline numbers, low-stock variants and the latest orders.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let pool = state.pool();
    let threshold = state.config().low_stock_threshold;
    let recent_filter = OrderFilter {
        limit: RECENT_ORDERS,
        ..OrderFilter::default()
    };

    let products = ProductRepository::new(pool);
    let customers = CustomerRepository::new(pool);
    let orders = OrderRepository::new(pool);
    let (totals, orders_by_status, tiers, low_stock, (recent_orders, _)) = tokio::try_join!(
        analytics::dashboard_totals(pool),
        analytics::orders_by_status(pool),
        customers.tier_counts(),
        products.low_stock(threshold, LOW_STOCK_LIMIT),
        orders.list(&recent_filter),
    )?;

    Ok(Json(Dashboard {
        totals,
        orders_by_status,
        customers_by_tier: tiers
            .into_iter()
            .map(|(tier, count)| TierCount { tier, count })
            .collect(),
        low_stock_threshold: threshold,
        low_stock,
        recent_orders,
    }))
}
