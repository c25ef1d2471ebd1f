//! Seed the database with a demo catalog and storefront content.
//!
//! Safe to re-run: products whose slug already exists are skipped, and hero
//! slides and social links are only written into empty tables.

use sqlx::PgPool;
use tracing::info;

use zolar_core::{Price, Slug};
use zolar_db::products::{NewProduct, NewVariant};
use zolar_db::content::{HeroSlideInput, SocialLinkInput};
use zolar_db::{ContentRepository, ProductRepository, RepositoryError};

/// A demo product: `(name, category, price, featured, colors)`.
type DemoProduct = (&'static str, &'static str, &'static str, bool, &'static [&'static str]);

const PRODUCTS: &[DemoProduct] = &[
    ("Desert Linen Shirt", "shirts", "850", true, &["sand", "white"]),
    ("Nile Cargo Pants", "pants", "1200", true, &["olive", "black"]),
    ("Sahara Oversized Tee", "t-shirts", "450", false, &["black", "bone"]),
    ("Dune Knit Polo", "shirts", "950", false, &["navy"]),
];

const SIZES: &[&str] = &["S", "M", "L", "XL"];

const DEMO_STOCK: i32 = 12;

/// Seed the demo catalog, hero slides and social links.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let created = seed_products(&pool).await?;
    info!(created, "Catalog seeded");

    seed_content(&pool).await?;

    info!("Seeding complete!");
    Ok(())
}

async fn seed_products(pool: &PgPool) -> Result<usize, Box<dyn std::error::Error>> {
    let repo = ProductRepository::new(pool);
    let mut created = 0;

    for &(name, category, price, featured, colors) in PRODUCTS {
        let slug = Slug::from_title(name)?;
        let price = Price::parse(price)?;
        let new_product = NewProduct {
            slug: slug.clone(),
            name: name.to_string(),
            description: format!("{name} from the ZOLAR demo collection."),
            category: category.to_string(),
            base_price: price,
            images: Vec::new(),
            is_active: true,
            is_featured: featured,
        };

        let product = match repo.create(&new_product).await {
            Ok(product) => product,
            Err(RepositoryError::Conflict(_)) => {
                info!(%slug, "Product already exists, skipping");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for color in colors {
            for size in SIZES {
                let variant = NewVariant {
                    sku: sku(&slug, color, size),
                    color: Some((*color).to_string()),
                    size: Some((*size).to_string()),
                    price,
                    stock: DEMO_STOCK,
                };
                repo.create_variant(product.id, &variant).await?;
            }
        }
        created += 1;
    }

    Ok(created)
}

async fn seed_content(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let repo = ContentRepository::new(pool);

    if repo.hero_slides(false).await?.is_empty() {
        let slides = [
            ("The Desert Edit", "Linen and knits for the long summer", "/products?category=shirts"),
            ("New Arrivals", "Fresh cuts every Thursday", "/products"),
        ];
        for (position, (title, subtitle, link)) in (0..).zip(slides) {
            repo.create_hero_slide(&HeroSlideInput {
                title: title.to_string(),
                subtitle: Some(subtitle.to_string()),
                image_url: format!("https://picsum.photos/seed/zolar-{position}/1600/900"),
                link_url: Some(link.to_string()),
                cta_label: Some("Shop now".to_string()),
                position,
                is_active: true,
            })
            .await?;
        }
        info!("Hero slides seeded");
    }

    if repo.social_links(false).await?.is_empty() {
        let links = [
            ("instagram", "https://instagram.com/zolar.store"),
            ("tiktok", "https://tiktok.com/@zolar.store"),
            ("facebook", "https://facebook.com/zolar.store"),
        ];
        for (position, (platform, url)) in (0..).zip(links) {
            repo.create_social_link(&SocialLinkInput {
                platform: platform.to_string(),
                url: url.to_string(),
                position,
                is_active: true,
            })
            .await?;
        }
        info!("Social links seeded");
    }

    Ok(())
}

/// Build a SKU like `ZLR-DESERT-LINEN-SHIRT-SAND-M`.
fn sku(slug: &Slug, color: &str, size: &str) -> String {
    format!("ZLR-{slug}-{color}-{size}").to_uppercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_format() {
        let slug = Slug::from_title("Desert Linen Shirt").unwrap();
        assert_eq!(sku(&slug, "sand", "M"), "ZLR-DESERT-LINEN-SHIRT-SAND-M");
    }

    #[test]
    fn test_demo_catalog_is_valid() {
        for &(name, _, price, _, colors) in PRODUCTS {
            assert!(Slug::from_title(name).is_ok(), "{name}");
            assert!(Price::parse(price).is_ok(), "{price}");
            assert!(!colors.is_empty());
        }
    }
}
