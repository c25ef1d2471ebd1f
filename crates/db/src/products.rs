//! Catalog repository: products and variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use zolar_core::checkout::VariantSnapshot;
use zolar_core::{Price, ProductId, Slug, VariantId};

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, slug, name, description, category, base_price, images, \
     is_active, is_featured, created_at, updated_at";

const VARIANT_COLUMNS: &str =
    "id, product_id, sku, color, size, price, stock, created_at, updated_at";

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub base_price: Price,
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A color/size SKU of a product with its own price and stock.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Price,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with all of its variants.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<Variant>,
    pub in_stock: bool,
}

impl ProductWithVariants {
    fn new(product: Product, variants: Vec<Variant>) -> Self {
        let in_stock = variants.iter().any(|v| v.stock > 0);
        Self {
            product,
            variants,
            in_stock,
        }
    }
}

/// A variant at or below the low-stock threshold.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockVariant {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub stock: i32,
}

/// Product list filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    /// Storefront lists only active products; the admin sees everything.
    pub active_only: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Parameters for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub slug: Slug,
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

const fn default_true() -> bool {
    true
}

/// Partial product update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub slug: Option<Slug>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub base_price: Option<Price>,
    pub images: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Parameters for creating a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub stock: i32,
}

/// Partial variant update. Stock changes go through
/// [`ProductRepository::adjust_stock`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantUpdate {
    pub sku: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Option<Price>,
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    variant_id: VariantId,
    product_id: ProductId,
    product_name: String,
    product_active: bool,
    sku: String,
    color: Option<String>,
    size: Option<String>,
    unit_price: Price,
    stock: i32,
}

impl From<SnapshotRow> for VariantSnapshot {
    fn from(r: SnapshotRow) -> Self {
        Self {
            variant_id: r.variant_id,
            product_id: r.product_id,
            product_name: r.product_name,
            product_active: r.product_active,
            sku: r.sku,
            color: r.color,
            size: r.size,
            unit_price: r.unit_price,
            stock: r.stock,
        }
    }
}

const SNAPSHOT_QUERY: &str = r"
    SELECT v.id AS variant_id, p.id AS product_id, p.name AS product_name,
           p.is_active AS product_active, v.sku, v.color, v.size,
           v.price AS unit_price, v.stock
    FROM variant v
    JOIN product p ON p.id = v.product_id
    WHERE v.id = ANY($1)
    ORDER BY v.id
";

/// Load pricing snapshots for the given variants, locking the rows until
/// the surrounding transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_snapshots(
    conn: &mut PgConnection,
    variant_ids: &[VariantId],
) -> Result<Vec<VariantSnapshot>, RepositoryError> {
    let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();
    let rows = sqlx::query_as::<_, SnapshotRow>(&format!("{SNAPSHOT_QUERY} FOR UPDATE OF v"))
        .bind(&ids)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(VariantSnapshot::from).collect())
}

/// Decrement stock only if enough remains. Returns `false` when the row
/// did not have `quantity` units left.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    variant_id: VariantId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE variant
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(variant_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching a filter, newest first. Returns the page and
    /// the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%')
              AND ($3::boolean IS NULL OR is_featured = $3)
              AND (NOT $4 OR is_active)
        ";

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product {WHERE} \
             ORDER BY is_featured DESC, created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.category.as_deref())
        .bind(filter.search.as_deref())
        .bind(filter.featured)
        .bind(filter.active_only)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM product {WHERE}"))
            .bind(filter.category.as_deref())
            .bind(filter.search.as_deref())
            .bind(filter.featured)
            .bind(filter.active_only)
            .fetch_one(self.pool)
            .await?;

        Ok((products, total))
    }

    /// Distinct categories of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT DISTINCT category FROM product
            WHERE is_active AND category <> ''
            ORDER BY category
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    /// Get a product and its variants by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_slug(
        &self,
        slug: &str,
        active_only: bool,
    ) -> Result<Option<ProductWithVariants>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE slug = $1 AND (NOT $2 OR is_active)"
        ))
        .bind(slug)
        .bind(active_only)
        .fetch_optional(self.pool)
        .await?;

        match product {
            Some(product) => {
                let variants = self.variants_for(product.id).await?;
                Ok(Some(ProductWithVariants::new(product, variants)))
            }
            None => Ok(None),
        }
    }

    /// Get a product and its variants by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithVariants>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match product {
            Some(product) => {
                let variants = self.variants_for(product.id).await?;
                Ok(Some(ProductWithVariants::new(product, variants)))
            }
            None => Ok(None),
        }
    }

    /// Active products among `ids`, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active_by_ids(&self, ids: &[i32]) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product \
             WHERE id = ANY($1) AND is_active \
             ORDER BY array_position($1, id)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// All variants of a product, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants_for(&self, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError> {
        let variants = sqlx::query_as::<_, Variant>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM variant WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(variants)
    }

    /// Pricing snapshots for a cart quote (no locking).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn snapshots(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<Vec<VariantSnapshot>, RepositoryError> {
        let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();
        let rows = sqlx::query_as::<_, SnapshotRow>(SNAPSHOT_QUERY)
            .bind(&ids)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(VariantSnapshot::from).collect())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, new), fields(slug = %new.slug))]
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO product
                (slug, name, description, category, base_price, images, is_active, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(new.slug.as_str())
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.base_price)
        .bind(&new.images)
        .bind(new.is_active)
        .bind(new.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already exists"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE product SET
                slug = COALESCE($2, slug),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                base_price = COALESCE($6, base_price),
                images = COALESCE($7, images),
                is_active = COALESCE($8, is_active),
                is_featured = COALESCE($9, is_featured),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.slug.as_ref().map(Slug::as_str))
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.category.as_deref())
        .bind(update.base_price)
        .bind(update.images.as_deref())
        .bind(update.is_active)
        .bind(update.is_featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product and its variants. Past order items keep their
    /// product name and SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Create a variant under a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is taken and
    /// `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self, new), fields(sku = %new.sku))]
    pub async fn create_variant(
        &self,
        product_id: ProductId,
        new: &NewVariant,
    ) -> Result<Variant, RepositoryError> {
        sqlx::query_as::<_, Variant>(&format!(
            r"
            INSERT INTO variant (product_id, sku, color, size, price, stock)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE EXISTS (SELECT 1 FROM product WHERE id = $1)
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(&new.sku)
        .bind(new.color.as_deref())
        .bind(new.size.as_deref())
        .bind(new.price)
        .bind(new.stock)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "sku already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial variant update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist and
    /// `RepositoryError::Conflict` if the new SKU is taken.
    pub async fn update_variant(
        &self,
        id: VariantId,
        update: &VariantUpdate,
    ) -> Result<Variant, RepositoryError> {
        sqlx::query_as::<_, Variant>(&format!(
            r"
            UPDATE variant SET
                sku = COALESCE($2, sku),
                color = COALESCE($3, color),
                size = COALESCE($4, size),
                price = COALESCE($5, price),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.sku.as_deref())
        .bind(update.color.as_deref())
        .bind(update.size.as_deref())
        .bind(update.price)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "sku already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    pub async fn delete_variant(&self, id: VariantId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM variant WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add `delta` (possibly negative) to a variant's stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist and
    /// `RepositoryError::Conflict` if the result would be negative or
    /// overflow the stock column.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, id: VariantId, delta: i32) -> Result<Variant, RepositoryError> {
        let updated = sqlx::query_as::<_, Variant>(&format!(
            r"
            UPDATE variant SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND stock::bigint + $2 BETWEEN 0 AND 2147483647
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool)
        .await?;

        if let Some(variant) = updated {
            return Ok(variant);
        }

        let exists: Option<(i32,)> = sqlx::query_as("SELECT stock FROM variant WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        match exists {
            Some((stock,)) if i64::from(stock) + i64::from(delta) < 0 => {
                Err(RepositoryError::Conflict(format!(
                    "stock cannot go negative (current {stock}, delta {delta})"
                )))
            }
            Some((stock,)) => Err(RepositoryError::Conflict(format!(
                "stock out of range (current {stock}, delta {delta})"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// Variants with stock at or below `threshold`, lowest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(
        &self,
        threshold: i32,
        limit: i64,
    ) -> Result<Vec<LowStockVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, LowStockVariant>(
            r"
            SELECT v.id AS variant_id, p.id AS product_id, p.name AS product_name, v.sku, v.stock
            FROM variant v
            JOIN product p ON p.id = v.product_id
            WHERE p.is_active AND v.stock <= $1
            ORDER BY v.stock, v.sku
            LIMIT $2
            ",
        )
        .bind(threshold)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
