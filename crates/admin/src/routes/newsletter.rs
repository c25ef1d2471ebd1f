//! Newsletter subscribers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use zolar_core::SubscriberId;
use zolar_db::NewsletterRepository;

use super::{Paginated, page_bounds};
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

/// Subscriber listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriberListParams {
    /// Only current subscribers (default `true`).
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Subscribers, newest first.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<SubscriberListParams>,
) -> Result<impl IntoResponse> {
    let (limit, offset) = page_bounds(params.page, params.per_page);
    let (subscribers, total) = NewsletterRepository::new(state.pool())
        .list(params.active.unwrap_or(true), limit, offset)
        .await?;
    Ok(Json(Paginated::new(subscribers, params.page, limit, total)))
}

/// Unsubscribe a subscriber. The row is kept so a later signup resubscribes.
#[instrument(skip_all, fields(subscriber_id = %id))]
pub async fn unsubscribe(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<SubscriberId>,
) -> Result<impl IntoResponse> {
    NewsletterRepository::new(state.pool()).unsubscribe(id).await?;
    state.audit().record(
        &admin,
        "subscriber.unsubscribe",
        "newsletter_subscriber",
        Some(id.to_string()),
        serde_json::Value::Null,
    );
    Ok(StatusCode::NO_CONTENT)
}
