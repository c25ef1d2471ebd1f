//! Order confirmation lookup.

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use zolar_core::Email;
use zolar_db::OrderRepository;

use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

/// Lookup query: the email the order was placed with.
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub email: String,
}

/// Show an order to the shopper who placed it.
///
/// A wrong email and an unknown number both return `404`.
#[instrument(skip(state, params))]
pub async fn show(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Query(params): Query<LookupParams>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&params.email)
        .map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;
    let order = OrderRepository::new(state.pool())
        .get_by_number(order_number.trim(), &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    Ok(Json(order))
}
