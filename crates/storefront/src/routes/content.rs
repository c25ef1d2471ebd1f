//! Storefront content: hero carousel, archive, social links, tracking IDs.

use axum::{extract::State, response::IntoResponse};
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::state::AppState;

/// Active hero slides ordered by position.
pub async fn hero(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let slides = state.catalog().hero_slides().await?;
    Ok(Json(json!({ "slides": slides })))
}

/// Published archive collections.
pub async fn archive_index(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let collections = state.catalog().archives().await?;
    Ok(Json(json!({ "collections": collections })))
}

/// One archive collection with its active products.
#[instrument(skip(state))]
pub async fn archive_show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let detail = state
        .catalog()
        .archive(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection".to_string()))?;
    Ok(Json(detail))
}

/// Active social links.
pub async fn social(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let links = state.catalog().social_links().await?;
    Ok(Json(json!({ "links": links })))
}

/// Tracking pixel IDs for client-side injection, plus the store currency
/// the purchase events should report.
pub async fn tracking(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config();
    Json(json!({
        "ga4_measurement_id": config.analytics.ga4_measurement_id,
        "meta_pixel_id": config.analytics.meta_pixel_id,
        "tiktok_pixel_id": config.analytics.tiktok_pixel_id,
        "currency": config.currency.code(),
    }))
}
