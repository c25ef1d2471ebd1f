//! Storefront content: hero carousel, archive collections and social links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use zolar_core::{ArchiveCollectionId, HeroSlideId, ProductId, Slug, SocialLinkId};

use super::RepositoryError;

const HERO_COLUMNS: &str =
    "id, title, subtitle, image_url, link_url, cta_label, position, is_active, created_at, updated_at";

const ARCHIVE_COLUMNS: &str = "id, slug, title, description, cover_image_url, season, position, \
     is_published, product_ids, created_at, updated_at";

const SOCIAL_COLUMNS: &str = "id, platform, url, position, is_active, created_at";

/// A hero carousel slide.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HeroSlide {
    pub id: HeroSlideId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub cta_label: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Hero slide fields. Used for create and full replacement.
#[derive(Debug, Clone, Deserialize)]
pub struct HeroSlideInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub cta_label: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A curated archive collection ("lookbook") of products.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ArchiveCollection {
    pub id: ArchiveCollectionId,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub cover_image_url: Option<String>,
    pub season: Option<String>,
    pub position: i32,
    pub is_published: bool,
    pub product_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Archive collection fields. Used for create and full replacement.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveCollectionInput {
    pub slug: Slug,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub cover_image_url: Option<String>,
    pub season: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
}

/// A link to one of the brand's social profiles.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SocialLink {
    pub id: SocialLinkId,
    pub platform: String,
    pub url: String,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Social link fields. Used for create and full replacement.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialLinkInput {
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

fn product_id_array(ids: &[ProductId]) -> Vec<i32> {
    ids.iter().map(ProductId::as_i32).collect()
}

/// Repository for content database operations.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Hero slides
    // =========================================================================

    /// Slides in carousel order. `active_only` hides disabled slides.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn hero_slides(&self, active_only: bool) -> Result<Vec<HeroSlide>, RepositoryError> {
        let slides = sqlx::query_as::<_, HeroSlide>(&format!(
            "SELECT {HERO_COLUMNS} FROM hero_slide WHERE (NOT $1 OR is_active) ORDER BY position, id"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(slides)
    }

    /// Create a hero slide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_hero_slide(&self, input: &HeroSlideInput) -> Result<HeroSlide, RepositoryError> {
        let slide = sqlx::query_as::<_, HeroSlide>(&format!(
            r"
            INSERT INTO hero_slide (title, subtitle, image_url, link_url, cta_label, position, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {HERO_COLUMNS}
            "
        ))
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(&input.image_url)
        .bind(input.link_url.as_deref())
        .bind(input.cta_label.as_deref())
        .bind(input.position)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await?;
        Ok(slide)
    }

    /// Replace a hero slide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the slide does not exist.
    pub async fn update_hero_slide(
        &self,
        id: HeroSlideId,
        input: &HeroSlideInput,
    ) -> Result<HeroSlide, RepositoryError> {
        sqlx::query_as::<_, HeroSlide>(&format!(
            r"
            UPDATE hero_slide SET
                title = $2, subtitle = $3, image_url = $4, link_url = $5,
                cta_label = $6, position = $7, is_active = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {HERO_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(&input.image_url)
        .bind(input.link_url.as_deref())
        .bind(input.cta_label.as_deref())
        .bind(input.position)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a hero slide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the slide does not exist.
    pub async fn delete_hero_slide(&self, id: HeroSlideId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM hero_slide WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set carousel order: each slide's position becomes its index in `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `ids` is not exactly the set of
    /// existing slides.
    #[instrument(skip(self))]
    pub async fn reorder_hero_slides(&self, ids: &[HeroSlideId]) -> Result<Vec<HeroSlide>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(HeroSlideId::as_i32).collect();
        let mut tx = self.pool.begin().await?;

        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hero_slide")
            .fetch_one(&mut *tx)
            .await?;

        let updated = sqlx::query(
            r"
            UPDATE hero_slide h
            SET position = o.ord::integer - 1, updated_at = NOW()
            FROM unnest($1::integer[]) WITH ORDINALITY AS o(id, ord)
            WHERE h.id = o.id
            ",
        )
        .bind(&raw)
        .execute(&mut *tx)
        .await?;

        let distinct = raw.iter().collect::<std::collections::HashSet<_>>().len();
        if i64::try_from(updated.rows_affected()).ok() != Some(existing) || distinct != raw.len() {
            return Err(RepositoryError::Conflict(
                "reorder must list every slide exactly once".to_string(),
            ));
        }

        tx.commit().await?;
        self.hero_slides(false).await
    }

    // =========================================================================
    // Archive collections
    // =========================================================================

    /// Collections in display order. `published_only` hides drafts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn archive_collections(
        &self,
        published_only: bool,
    ) -> Result<Vec<ArchiveCollection>, RepositoryError> {
        let collections = sqlx::query_as::<_, ArchiveCollection>(&format!(
            "SELECT {ARCHIVE_COLUMNS} FROM archive_collection \
             WHERE (NOT $1 OR is_published) ORDER BY position, id"
        ))
        .bind(published_only)
        .fetch_all(self.pool)
        .await?;
        Ok(collections)
    }

    /// A published collection by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn published_archive_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ArchiveCollection>, RepositoryError> {
        let collection = sqlx::query_as::<_, ArchiveCollection>(&format!(
            "SELECT {ARCHIVE_COLUMNS} FROM archive_collection WHERE slug = $1 AND is_published"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(collection)
    }

    /// Create an archive collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_archive(
        &self,
        input: &ArchiveCollectionInput,
    ) -> Result<ArchiveCollection, RepositoryError> {
        sqlx::query_as::<_, ArchiveCollection>(&format!(
            r"
            INSERT INTO archive_collection
                (slug, title, description, cover_image_url, season, position, is_published, product_ids)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ARCHIVE_COLUMNS}
            "
        ))
        .bind(input.slug.as_str())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.cover_image_url.as_deref())
        .bind(input.season.as_deref())
        .bind(input.position)
        .bind(input.is_published)
        .bind(product_id_array(&input.product_ids))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already exists"))
    }

    /// Replace an archive collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection does not exist
    /// and `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update_archive(
        &self,
        id: ArchiveCollectionId,
        input: &ArchiveCollectionInput,
    ) -> Result<ArchiveCollection, RepositoryError> {
        sqlx::query_as::<_, ArchiveCollection>(&format!(
            r"
            UPDATE archive_collection SET
                slug = $2, title = $3, description = $4, cover_image_url = $5,
                season = $6, position = $7, is_published = $8, product_ids = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ARCHIVE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.slug.as_str())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.cover_image_url.as_deref())
        .bind(input.season.as_deref())
        .bind(input.position)
        .bind(input.is_published)
        .bind(product_id_array(&input.product_ids))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an archive collection. The products themselves are untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection does not exist.
    pub async fn delete_archive(&self, id: ArchiveCollectionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM archive_collection WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Social links
    // =========================================================================

    /// Social links in display order. `active_only` hides disabled links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn social_links(&self, active_only: bool) -> Result<Vec<SocialLink>, RepositoryError> {
        let links = sqlx::query_as::<_, SocialLink>(&format!(
            "SELECT {SOCIAL_COLUMNS} FROM social_link WHERE (NOT $1 OR is_active) ORDER BY position, id"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(links)
    }

    /// Create a social link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_social_link(&self, input: &SocialLinkInput) -> Result<SocialLink, RepositoryError> {
        let link = sqlx::query_as::<_, SocialLink>(&format!(
            "INSERT INTO social_link (platform, url, position, is_active) VALUES ($1, $2, $3, $4) \
             RETURNING {SOCIAL_COLUMNS}"
        ))
        .bind(&input.platform)
        .bind(&input.url)
        .bind(input.position)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await?;
        Ok(link)
    }

    /// Replace a social link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the link does not exist.
    pub async fn update_social_link(
        &self,
        id: SocialLinkId,
        input: &SocialLinkInput,
    ) -> Result<SocialLink, RepositoryError> {
        sqlx::query_as::<_, SocialLink>(&format!(
            "UPDATE social_link SET platform = $2, url = $3, position = $4, is_active = $5 \
             WHERE id = $1 RETURNING {SOCIAL_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.platform)
        .bind(&input.url)
        .bind(input.position)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a social link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the link does not exist.
    pub async fn delete_social_link(&self, id: SocialLinkId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM social_link WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
