//! Catalog management: products, variants and stock.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use zolar_core::{Price, ProductId, Slug, VariantId};
use zolar_db::ProductRepository;
use zolar_db::products::{NewProduct, NewVariant, ProductFilter, ProductUpdate, VariantUpdate};

use super::{Paginated, page_bounds, search_term};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::{RequireAdmin, RequireWriter};
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

/// All products, active or not.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse> {
    let (limit, offset) = page_bounds(params.page, params.per_page);
    let filter = ProductFilter {
        category: search_term(params.category),
        search: search_term(params.q),
        featured: params.featured,
        active_only: false,
        limit,
        offset,
    };
    let (products, total) = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Paginated::new(products, params.page, limit, total)))
}

/// A product with its variants.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    Ok(Json(product))
}

const fn default_true() -> bool {
    true
}

/// New product request body. The slug is derived from the name when omitted.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub base_price: Price,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl CreateProductRequest {
    /// Validate and resolve the slug.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a blank name or an unusable slug.
    pub fn into_new_product(self) -> Result<NewProduct> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_string()));
        }
        let slug = match self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => Slug::parse(slug),
            None => Slug::from_title(&name),
        }
        .map_err(|e| AppError::BadRequest(format!("Invalid slug: {e}")))?;

        Ok(NewProduct {
            slug,
            name,
            description: self.description,
            category: self.category.trim().to_string(),
            base_price: self.base_price,
            images: self.images,
            is_active: self.is_active,
            is_featured: self.is_featured,
        })
    }
}

/// Create a product.
#[instrument(skip_all)]
pub async fn create(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse> {
    let new = request.into_new_product()?;
    let product = ProductRepository::new(state.pool()).create(&new).await?;

    state.audit().record(
        &admin,
        "product.create",
        "product",
        Some(product.id.to_string()),
        json!({ "slug": product.slug, "name": product.name }),
    );
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product; absent fields are left as they are.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> Result<impl IntoResponse> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name cannot be blank".to_string()));
    }
    let product = ProductRepository::new(state.pool()).update(id, &update).await?;

    state.audit().record(
        &admin,
        "product.update",
        "product",
        Some(id.to_string()),
        json!({
            "slug": product.slug,
            "is_active": product.is_active,
            "base_price": product.base_price,
        }),
    );
    Ok(Json(product))
}

/// Delete a product and its variants.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn delete(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    ProductRepository::new(state.pool()).delete(id).await?;
    state.audit().record(
        &admin,
        "product.delete",
        "product",
        Some(id.to_string()),
        serde_json::Value::Null,
    );
    Ok(StatusCode::NO_CONTENT)
}

fn validate_variant(new: NewVariant) -> Result<NewVariant> {
    let sku = new.sku.trim().to_string();
    if sku.is_empty() {
        return Err(AppError::BadRequest("sku is required".to_string()));
    }
    if new.stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".to_string()));
    }
    Ok(NewVariant { sku, ..new })
}

/// Add a variant to a product.
#[instrument(skip_all, fields(product_id = %product_id))]
pub async fn create_variant(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(new): Json<NewVariant>,
) -> Result<impl IntoResponse> {
    let new = validate_variant(new)?;
    let variant = ProductRepository::new(state.pool())
        .create_variant(product_id, &new)
        .await?;

    state.audit().record(
        &admin,
        "variant.create",
        "variant",
        Some(variant.id.to_string()),
        json!({ "product_id": product_id, "sku": variant.sku, "stock": variant.stock }),
    );
    Ok((StatusCode::CREATED, Json(variant)))
}

/// Update a variant's SKU, options or price.
#[instrument(skip_all, fields(variant_id = %id))]
pub async fn update_variant(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Json(update): Json<VariantUpdate>,
) -> Result<impl IntoResponse> {
    if update.sku.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(AppError::BadRequest("sku cannot be blank".to_string()));
    }
    let variant = ProductRepository::new(state.pool())
        .update_variant(id, &update)
        .await?;

    state.audit().record(
        &admin,
        "variant.update",
        "variant",
        Some(id.to_string()),
        json!({ "sku": variant.sku, "price": variant.price }),
    );
    Ok(Json(variant))
}

/// Delete a variant. Past order lines keep their snapshot.
#[instrument(skip_all, fields(variant_id = %id))]
pub async fn delete_variant(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<impl IntoResponse> {
    ProductRepository::new(state.pool()).delete_variant(id).await?;
    state.audit().record(
        &admin,
        "variant.delete",
        "variant",
        Some(id.to_string()),
        serde_json::Value::Null,
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Stock adjustment request body.
#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    /// Units to add (positive) or remove (negative).
    pub delta: i32,
    /// Free-text reason kept in the audit log (e.g. "recount", "damaged").
    #[serde(default)]
    pub reason: Option<String>,
}

/// Largest change a single adjustment may make, in either direction.
pub const MAX_STOCK_DELTA: i32 = 1_000_000;

fn validate_delta(delta: i32) -> Result<i32> {
    if delta == 0 {
        return Err(AppError::BadRequest("delta must not be zero".to_string()));
    }
    if delta.unsigned_abs() > MAX_STOCK_DELTA.unsigned_abs() {
        return Err(AppError::BadRequest(format!(
            "delta must be between -{MAX_STOCK_DELTA} and {MAX_STOCK_DELTA}"
        )));
    }
    Ok(delta)
}

/// Adjust stock by a delta. The result can never go below zero.
#[instrument(skip_all, fields(variant_id = %id))]
pub async fn adjust_stock(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Json(adjustment): Json<StockAdjustment>,
) -> Result<impl IntoResponse> {
    let delta = validate_delta(adjustment.delta)?;
    let variant = ProductRepository::new(state.pool())
        .adjust_stock(id, delta)
        .await?;

    state.audit().record(
        &admin,
        "variant.stock",
        "variant",
        Some(id.to_string()),
        json!({
            "sku": variant.sku,
            "delta": adjustment.delta,
            "stock": variant.stock,
            "reason": adjustment.reason,
        }),
    );
    Ok(Json(variant))
}
