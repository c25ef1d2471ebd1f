//! Cached read access to the catalog and storefront content.
//!
//! Results are cached for 5 minutes using `moka`. Searches are not cached.
//! Checkout calls [`CatalogService::invalidate_all`] after every order since
//! stock levels changed.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, instrument};

use zolar_db::content::{ArchiveCollection, HeroSlide, SocialLink};
use zolar_db::products::{Product, ProductFilter, ProductWithVariants};
use zolar_db::{ContentRepository, ProductRepository, RepositoryError};

/// Maximum page size for product listings.
pub const MAX_PER_PAGE: u32 = 48;

/// Query parameters for a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One page of products.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// An archive collection with its active products.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveDetail {
    #[serde(flatten)]
    pub collection: ArchiveCollection,
    pub products: Vec<Product>,
}

/// Cache key for catalog and content reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products(ProductQuery),
    Product(String),
    Categories,
    HeroSlides,
    Archives,
    Archive(String),
    SocialLinks,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<ProductPage>),
    Product(Option<Arc<ProductWithVariants>>),
    Categories(Arc<Vec<String>>),
    HeroSlides(Arc<Vec<HeroSlide>>),
    Archives(Arc<Vec<ArchiveCollection>>),
    Archive(Option<Arc<ArchiveDetail>>),
    SocialLinks(Arc<Vec<SocialLink>>),
}

/// Catalog and content reader with a shared cache.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogService {
    /// Create a catalog service over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { pool, cache }
    }

    /// List active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: ProductQuery) -> Result<Arc<ProductPage>, RepositoryError> {
        let cacheable = query.search.is_none();
        let key = CacheKey::Products(query.clone());
        if cacheable && let Some(CacheValue::Products(page)) = self.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let (limit, offset) = zolar_db::page_bounds(query.page, query.per_page, MAX_PER_PAGE);
        let filter = ProductFilter {
            category: query.category,
            search: query.search,
            featured: query.featured,
            active_only: true,
            limit,
            offset,
        };
        let (products, total) = ProductRepository::new(&self.pool).list(&filter).await?;
        let per_page = u32::try_from(limit).unwrap_or(MAX_PER_PAGE);
        let page = Arc::new(ProductPage {
            products,
            page: query.page.unwrap_or(1).max(1),
            per_page,
            total,
        });

        if cacheable {
            self.cache.insert(key, CacheValue::Products(page.clone())).await;
        }
        Ok(page)
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    #[instrument(skip(self))]
    pub async fn product(&self, slug: &str) -> Result<Option<Arc<ProductWithVariants>>, RepositoryError> {
        let key = CacheKey::Product(slug.to_string());
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product = ProductRepository::new(&self.pool)
            .get_by_slug(slug, true)
            .await?
            .map(Arc::new);
        self.cache.insert(key, CacheValue::Product(product.clone())).await;
        Ok(product)
    }

    /// Distinct categories of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    pub async fn categories(&self) -> Result<Arc<Vec<String>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) = self.cache.get(&CacheKey::Categories).await {
            return Ok(categories);
        }
        let categories = Arc::new(ProductRepository::new(&self.pool).categories().await?);
        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// Active hero slides in carousel order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    pub async fn hero_slides(&self) -> Result<Arc<Vec<HeroSlide>>, RepositoryError> {
        if let Some(CacheValue::HeroSlides(slides)) = self.cache.get(&CacheKey::HeroSlides).await {
            return Ok(slides);
        }
        let slides = Arc::new(ContentRepository::new(&self.pool).hero_slides(true).await?);
        self.cache
            .insert(CacheKey::HeroSlides, CacheValue::HeroSlides(slides.clone()))
            .await;
        Ok(slides)
    }

    /// Published archive collections.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    pub async fn archives(&self) -> Result<Arc<Vec<ArchiveCollection>>, RepositoryError> {
        if let Some(CacheValue::Archives(archives)) = self.cache.get(&CacheKey::Archives).await {
            return Ok(archives);
        }
        let archives = Arc::new(
            ContentRepository::new(&self.pool)
                .archive_collections(true)
                .await?,
        );
        self.cache
            .insert(CacheKey::Archives, CacheValue::Archives(archives.clone()))
            .await;
        Ok(archives)
    }

    /// A published archive collection with its active products, in the
    /// collection's order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    #[instrument(skip(self))]
    pub async fn archive(&self, slug: &str) -> Result<Option<Arc<ArchiveDetail>>, RepositoryError> {
        let key = CacheKey::Archive(slug.to_string());
        if let Some(CacheValue::Archive(detail)) = self.cache.get(&key).await {
            debug!("Cache hit for archive");
            return Ok(detail);
        }

        let detail = match ContentRepository::new(&self.pool)
            .published_archive_by_slug(slug)
            .await?
        {
            Some(collection) => {
                let products = ProductRepository::new(&self.pool)
                    .list_active_by_ids(&collection.product_ids)
                    .await?;
                Some(Arc::new(ArchiveDetail {
                    collection,
                    products,
                }))
            }
            None => None,
        };
        self.cache.insert(key, CacheValue::Archive(detail.clone())).await;
        Ok(detail)
    }

    /// Active social links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails.
    pub async fn social_links(&self) -> Result<Arc<Vec<SocialLink>>, RepositoryError> {
        if let Some(CacheValue::SocialLinks(links)) = self.cache.get(&CacheKey::SocialLinks).await {
            return Ok(links);
        }
        let links = Arc::new(ContentRepository::new(&self.pool).social_links(true).await?);
        self.cache
            .insert(CacheKey::SocialLinks, CacheValue::SocialLinks(links.clone()))
            .await;
        Ok(links)
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
