//! Cash-on-delivery checkout route.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use crate::error::Result;
use crate::extract::Json;
use crate::services::checkout::{self, CheckoutRequest};
use crate::state::AppState;

/// Place a cash-on-delivery order. Responds `201 Created` with the
/// confirmation.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn cod(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let confirmation = checkout::place_cod_order(&state, request).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}
