//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Error for a required environment variable that is unset.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);

/// Read `DATABASE_URL` (after loading `.env`) as a secret.
///
/// # Errors
///
/// Returns `MissingEnvVar` if `DATABASE_URL` is unset.
pub fn database_url() -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar("DATABASE_URL"))
}

/// Connect to the database named by `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the variable is missing or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(zolar_db::create_pool(&url).await?)
}
