//! Cart quoting.
//!
//! The cart lives in the browser; the server only prices it. Stock problems
//! are reported per line in a `200` response so the UI can show them next to
//! the affected items.

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use zolar_core::VariantId;
use zolar_core::checkout::{self, RequestedLine};
use zolar_db::ProductRepository;

use crate::error::Result;
use crate::extract::Json;
use crate::state::AppState;

/// Cart quote request body.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<RequestedLine>,
}

/// Price a browser-held cart.
#[instrument(skip(state, request), fields(lines = request.items.len()))]
pub async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<impl IntoResponse> {
    let lines = checkout::normalize_lines(&request.items)?;
    let ids: Vec<VariantId> = lines.iter().map(|l| l.variant_id).collect();
    let snapshots = ProductRepository::new(state.pool()).snapshots(&ids).await?;

    let quote = checkout::quote_cart(&lines, &snapshots, state.config().shipping_fee)?;
    Ok(Json(json!({
        "quote": quote,
        "currency": state.config().currency.code(),
    })))
}
