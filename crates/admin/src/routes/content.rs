//! Storefront content: hero carousel, archive collections and social links.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use zolar_core::{ArchiveCollectionId, HeroSlideId, SocialLinkId};
use zolar_db::ContentRepository;
use zolar_db::content::{ArchiveCollectionInput, HeroSlideInput, SocialLinkInput};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::state::AppState;

fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

fn valid_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| AppError::BadRequest(format!("{field} is not a valid URL: {e}")))
}

// =============================================================================
// Hero slides
// =============================================================================

fn validate_hero(input: &HeroSlideInput) -> Result<()> {
    required("title", &input.title)?;
    required("image_url", &input.image_url)?;
    valid_url("image_url", &input.image_url)
}

/// All hero slides, including inactive ones.
pub async fn hero_index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let slides = ContentRepository::new(state.pool()).hero_slides(false).await?;
    Ok(Json(json!({ "slides": slides })))
}

/// Create a hero slide.
#[instrument(skip_all)]
pub async fn hero_create(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Json(input): Json<HeroSlideInput>,
) -> Result<impl IntoResponse> {
    validate_hero(&input)?;
    let slide = ContentRepository::new(state.pool())
        .create_hero_slide(&input)
        .await?;
    state.audit().record(
        &admin,
        "hero_slide.create",
        "hero_slide",
        Some(slide.id.to_string()),
        json!({ "title": slide.title }),
    );
    Ok((StatusCode::CREATED, Json(slide)))
}

/// Replace a hero slide.
#[instrument(skip_all, fields(slide_id = %id))]
pub async fn hero_update(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<HeroSlideId>,
    Json(input): Json<HeroSlideInput>,
) -> Result<impl IntoResponse> {
    validate_hero(&input)?;
    let slide = ContentRepository::new(state.pool())
        .update_hero_slide(id, &input)
        .await?;
    state.audit().record(
        &admin,
        "hero_slide.update",
        "hero_slide",
        Some(id.to_string()),
        json!({ "title": slide.title, "is_active": slide.is_active }),
    );
    Ok(Json(slide))
}

/// Delete a hero slide.
#[instrument(skip_all, fields(slide_id = %id))]
pub async fn hero_delete(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<HeroSlideId>,
) -> Result<impl IntoResponse> {
    ContentRepository::new(state.pool()).delete_hero_slide(id).await?;
    state.audit().record(
        &admin,
        "hero_slide.delete",
        "hero_slide",
        Some(id.to_string()),
        serde_json::Value::Null,
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Reorder request body: every slide ID, in the new order.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<HeroSlideId>,
}

/// Reorder the carousel.
#[instrument(skip_all, fields(count = request.ids.len()))]
pub async fn hero_reorder(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> Result<impl IntoResponse> {
    let slides = ContentRepository::new(state.pool())
        .reorder_hero_slides(&request.ids)
        .await?;
    state.audit().record(
        &admin,
        "hero_slide.reorder",
        "hero_slide",
        None,
        json!({ "ids": request.ids }),
    );
    Ok(Json(json!({ "slides": slides })))
}

// =============================================================================
// Archive collections
// =============================================================================

fn validate_archive(input: &ArchiveCollectionInput) -> Result<()> {
    required("title", &input.title)?;
    if let Some(cover) = input.cover_image_url.as_deref() {
        valid_url("cover_image_url", cover)?;
    }
    Ok(())
}

/// All archive collections, published or not.
pub async fn archive_index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let collections = ContentRepository::new(state.pool())
        .archive_collections(false)
        .await?;
    Ok(Json(json!({ "collections": collections })))
}

/// Create an archive collection.
#[instrument(skip_all)]
pub async fn archive_create(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Json(input): Json<ArchiveCollectionInput>,
) -> Result<impl IntoResponse> {
    validate_archive(&input)?;
    let collection = ContentRepository::new(state.pool())
        .create_archive(&input)
        .await?;
    state.audit().record(
        &admin,
        "archive.create",
        "archive_collection",
        Some(collection.id.to_string()),
        json!({ "slug": collection.slug, "products": collection.product_ids.len() }),
    );
    Ok((StatusCode::CREATED, Json(collection)))
}

/// Replace an archive collection.
#[instrument(skip_all, fields(collection_id = %id))]
pub async fn archive_update(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<ArchiveCollectionId>,
    Json(input): Json<ArchiveCollectionInput>,
) -> Result<impl IntoResponse> {
    validate_archive(&input)?;
    let collection = ContentRepository::new(state.pool())
        .update_archive(id, &input)
        .await?;
    state.audit().record(
        &admin,
        "archive.update",
        "archive_collection",
        Some(id.to_string()),
        json!({ "slug": collection.slug, "is_published": collection.is_published }),
    );
    Ok(Json(collection))
}

/// Delete an archive collection.
#[instrument(skip_all, fields(collection_id = %id))]
pub async fn archive_delete(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<ArchiveCollectionId>,
) -> Result<impl IntoResponse> {
    ContentRepository::new(state.pool()).delete_archive(id).await?;
    state.audit().record(
        &admin,
        "archive.delete",
        "archive_collection",
        Some(id.to_string()),
        serde_json::Value::Null,
    );
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Social links
// =============================================================================

fn validate_social(input: &SocialLinkInput) -> Result<()> {
    required("platform", &input.platform)?;
    valid_url("url", &input.url)
}

/// All social links, including inactive ones.
pub async fn social_index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let links = ContentRepository::new(state.pool()).social_links(false).await?;
    Ok(Json(json!({ "links": links })))
}

/// Create a social link.
#[instrument(skip_all)]
pub async fn social_create(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Json(input): Json<SocialLinkInput>,
) -> Result<impl IntoResponse> {
    validate_social(&input)?;
    let link = ContentRepository::new(state.pool())
        .create_social_link(&input)
        .await?;
    state.audit().record(
        &admin,
        "social_link.create",
        "social_link",
        Some(link.id.to_string()),
        json!({ "platform": link.platform }),
    );
    Ok((StatusCode::CREATED, Json(link)))
}

/// Replace a social link.
#[instrument(skip_all, fields(link_id = %id))]
pub async fn social_update(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<SocialLinkId>,
    Json(input): Json<SocialLinkInput>,
) -> Result<impl IntoResponse> {
    validate_social(&input)?;
    let link = ContentRepository::new(state.pool())
        .update_social_link(id, &input)
        .await?;
    state.audit().record(
        &admin,
        "social_link.update",
        "social_link",
        Some(id.to_string()),
        json!({ "platform": link.platform, "is_active": link.is_active }),
    );
    Ok(Json(link))
}

/// Delete a social link.
#[instrument(skip_all, fields(link_id = %id))]
pub async fn social_delete(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    Path(id): Path<SocialLinkId>,
) -> Result<impl IntoResponse> {
    ContentRepository::new(state.pool()).delete_social_link(id).await?;
    state.audit().record(
        &admin,
        "social_link.delete",
        "social_link",
        Some(id.to_string()),
        serde_json::Value::Null,
    );
    Ok(StatusCode::NO_CONTENT)
}
