//! Newsletter subscription route.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use zolar_core::Email;
use zolar_db::NewsletterRepository;
use zolar_db::newsletter::SubscribeOutcome;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::state::AppState;

/// Longest accepted `source` tag.
const MAX_SOURCE_LENGTH: usize = 64;

/// Newsletter subscription body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    /// Where on the site the signup came from (e.g. `footer`, `popup`).
    #[serde(default)]
    pub source: Option<String>,
}

/// Subscribe to the newsletter.
///
/// Idempotent: `201` for a new subscriber, `200` when already subscribed or
/// resubscribing.
#[instrument(skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&request.email)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address.".to_string()))?;
    let source = request
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.chars().take(MAX_SOURCE_LENGTH).collect::<String>());

    let outcome = NewsletterRepository::new(state.pool())
        .subscribe(&email, source.as_deref())
        .await?;
    tracing::info!(outcome = ?outcome, "Newsletter signup");

    let status = match outcome {
        SubscribeOutcome::Subscribed => StatusCode::CREATED,
        SubscribeOutcome::AlreadySubscribed | SubscribeOutcome::Resubscribed => StatusCode::OK,
    };
    Ok((status, Json(json!({ "status": outcome }))))
}
