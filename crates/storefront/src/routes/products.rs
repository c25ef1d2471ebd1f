//! Product route handlers.

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::services::catalog::ProductQuery;
use crate::state::AppState;

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub q: Option<String>,
    pub featured: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<ProductListParams> for ProductQuery {
    fn from(params: ProductListParams) -> Self {
        let non_empty = |s: Option<String>| {
            s.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            category: non_empty(params.category),
            search: non_empty(params.q),
            featured: params.featured,
            page: params.page,
            per_page: params.per_page,
        }
    }
}

/// List active products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse> {
    let page = state.catalog().products(params.into()).await?;
    Ok(Json(page))
}

/// Product detail with variants.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let product = state
        .catalog()
        .product(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    Ok(Json(product))
}

/// Distinct categories of active products.
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = state.catalog().categories().await?;
    Ok(Json(json!({ "categories": categories })))
}
