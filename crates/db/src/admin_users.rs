//! Admin account repository.
//!
//! Admins authenticate with a long random API token. Only its SHA-256 hex
//! digest is stored; the plaintext is shown once when the account is created.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::instrument;

use zolar_core::{AdminRole, AdminUserId, Email};

use super::RepositoryError;

const ADMIN_COLUMNS: &str = "id, email, name, role, created_at, last_seen_at";

/// Random bytes in a freshly issued token.
const TOKEN_BYTES: usize = 32;

/// Issue a new plaintext API token (64 hex characters).
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest of a token, as stored in `admin_user.token_hash`.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// An admin account. The token hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Repository for admin account operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an admin with the given token hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    #[instrument(skip(self, token_hash), fields(email = %email))]
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        role: AdminRole,
        token_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        sqlx::query_as::<_, AdminUser>(&format!(
            "INSERT INTO admin_user (email, name, role, token_hash) VALUES ($1, $2, $3, $4) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(email)
        .bind(name)
        .bind(role)
        .bind(token_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "admin email already exists"))
    }

    /// Resolve a token hash to its admin and record the visit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn authenticate(&self, token_hash: &str) -> Result<Option<AdminUser>, RepositoryError> {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            "UPDATE admin_user SET last_seen_at = NOW() WHERE token_hash = $1 \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    /// All admins, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        let admins = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_user ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(admins)
    }

    /// Delete an admin. The last super admin cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the admin does not exist and
    /// `RepositoryError::Conflict` if it is the last super admin.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AdminUserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM admin_user
            WHERE id = $1
              AND (role <> 'super_admin'
                   OR (SELECT COUNT(*) FROM admin_user WHERE role = 'super_admin') > 1)
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM admin_user WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        match exists {
            Some(_) => Err(RepositoryError::Conflict(
                "cannot delete the last super admin".to_string(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_token_known_value() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_token("abc").len(), 64);
    }
}
