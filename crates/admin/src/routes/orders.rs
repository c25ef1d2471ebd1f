//! Order management.

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use zolar_core::{OrderId, OrderStatus};
use zolar_db::OrderRepository;
use zolar_db::orders::OrderFilter;

use super::{Paginated, page_bounds, search_term};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

/// Order listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
    /// Order number or customer email fragment.
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Orders, newest first.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse> {
    let (limit, offset) = page_bounds(params.page, params.per_page);
    let filter = OrderFilter {
        status: params.status,
        search: search_term(params.q),
        customer_id: None,
        limit,
        offset,
    };
    let (orders, total) = OrderRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Paginated::new(orders, params.page, limit, total)))
}

/// An order with its line items.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order = OrderRepository::new(state.pool())
        .get_with_items(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    Ok(Json(order))
}

/// Status change request body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Move an order along its lifecycle. Cancelling returns the items to stock.
///
/// Transitions the lifecycle does not allow answer `409 Conflict`.
#[instrument(skip_all, fields(order_id = %id, status = %update.status))]
pub async fn update_status(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<impl IntoResponse> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, update.status)
        .await?;

    state.audit().record(
        &admin,
        "order.status",
        "order",
        Some(id.to_string()),
        json!({ "order_number": order.order_number, "status": order.status }),
    );
    Ok(Json(order))
}
