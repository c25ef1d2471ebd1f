//! Sales analytics.

use axum::{extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use zolar_db::analytics::{self, DailySales, TopProduct};

use crate::error::{AppError, Result};
use crate::extract::{Json, Query};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const DEFAULT_DAYS: i32 = 30;
const MAX_DAYS: i32 = 365;
const TOP_PRODUCTS: i64 = 10;

/// Sales report query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SalesParams {
    pub days: Option<i32>,
}

impl SalesParams {
    /// Requested window, 1-365 days.
    fn days(&self) -> Result<i32> {
        let days = self.days.unwrap_or(DEFAULT_DAYS);
        if (1..=MAX_DAYS).contains(&days) {
            Ok(days)
        } else {
            Err(AppError::BadRequest(format!(
                "days must be between 1 and {MAX_DAYS}"
            )))
        }
    }
}

/// Sales report payload.
#[derive(Debug, Serialize)]
pub struct SalesReport {
    pub days: i32,
    pub daily: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

/// Daily orders and revenue plus best sellers over the window.
#[instrument(skip_all)]
pub async fn sales(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<SalesParams>,
) -> Result<impl IntoResponse> {
    let days = params.days()?;
    let since = Utc::now() - Duration::days(i64::from(days));

    let (daily, top_products) = tokio::try_join!(
        analytics::daily_sales(state.pool(), days),
        analytics::top_products(state.pool(), since, TOP_PRODUCTS),
    )?;

    Ok(Json(SalesReport {
        days,
        daily,
        top_products,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_days_window() {
        assert_eq!(SalesParams { days: None }.days().unwrap(), 30);
        assert_eq!(SalesParams { days: Some(365) }.days().unwrap(), 365);
        assert!(SalesParams { days: Some(0) }.days().is_err());
        assert!(SalesParams { days: Some(366) }.days().is_err());
    }
}
