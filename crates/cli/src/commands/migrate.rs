//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! zolar-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations are embedded from `crates/db/migrations/` at build time, so the
//! binary can be shipped without the SQL files.

use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database connection failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!(
        available = zolar_db::MIGRATOR.iter().count(),
        "Running migrations..."
    );
    zolar_db::MIGRATOR
        .run(&pool)
        .await
        .map_err(MigrationError::from)?;

    tracing::info!("Migrations complete!");
    Ok(())
}
