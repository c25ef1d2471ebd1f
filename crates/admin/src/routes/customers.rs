//! Customer management.

use axum::{extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use zolar_core::{CustomerId, CustomerTier};
use zolar_db::customers::{Customer, CustomerFilter};
use zolar_db::orders::{Order, OrderFilter};
use zolar_db::{CustomerRepository, OrderRepository};

use super::{Paginated, page_bounds, search_term};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

/// Orders shown on the customer detail.
const CUSTOMER_ORDERS: i64 = 50;

/// Longest accepted admin note.
const MAX_NOTES_LENGTH: usize = 2000;

/// Customer listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerListParams {
    pub tier: Option<CustomerTier>,
    /// Email, name or phone fragment.
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Customers, most recent buyers first.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> Result<impl IntoResponse> {
    let (limit, offset) = page_bounds(params.page, params.per_page);
    let filter = CustomerFilter {
        tier: params.tier,
        search: search_term(params.q),
        limit,
        offset,
    };
    let (customers, total) = CustomerRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Paginated::new(customers, params.page, limit, total)))
}

/// Customer detail payload.
#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub orders: Vec<Order>,
}

/// A customer with their order history.
#[instrument(skip_all, fields(customer_id = %id))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CustomerId>,
) -> Result<impl IntoResponse> {
    let customer = CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;
    let filter = OrderFilter {
        customer_id: Some(id),
        limit: CUSTOMER_ORDERS,
        ..OrderFilter::default()
    };
    let (orders, _) = OrderRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(CustomerDetail { customer, orders }))
}

/// Customer edit request body.
#[derive(Debug, Deserialize)]
pub struct CustomerUpdate {
    /// Internal notes; blank or `null` clears them.
    pub notes: Option<String>,
}

impl CustomerUpdate {
    fn notes(&self) -> Result<Option<&str>> {
        let notes = self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
            return Err(AppError::BadRequest(format!(
                "notes must be at most {MAX_NOTES_LENGTH} characters"
            )));
        }
        Ok(notes)
    }
}

/// Edit the admin notes on a customer.
#[instrument(skip_all, fields(customer_id = %id))]
pub async fn update(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<CustomerId>,
    Json(update): Json<CustomerUpdate>,
) -> Result<impl IntoResponse> {
    let notes = update.notes()?;
    let customer = CustomerRepository::new(state.pool())
        .update_notes(id, notes)
        .await?;

    state.audit().record(
        &admin,
        "customer.notes",
        "customer",
        Some(id.to_string()),
        json!({ "cleared": notes.is_none() }),
    );
    Ok(Json(customer))
}
