//! Admin action feed.

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use zolar_db::admin_actions;

use crate::error::Result;
use crate::extract::{Json, Query};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Feed query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<i64>,
}

impl ActivityParams {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Most recent admin actions, newest first.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Result<impl IntoResponse> {
    let actions = admin_actions::recent(state.pool(), params.limit()).await?;
    Ok(Json(json!({ "actions": actions })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        assert_eq!(ActivityParams { limit: None }.limit(), 50);
        assert_eq!(ActivityParams { limit: Some(0) }.limit(), 1);
        assert_eq!(ActivityParams { limit: Some(5000) }.limit(), 200);
    }
}
