//! Audit log of admin actions.
//!
//! Free functions, since the audit logger writes from detached tasks that
//! only hold a pool handle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use zolar_core::{AdminActionId, AdminUserId};

use super::RepositoryError;

/// One recorded admin action.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminAction {
    pub id: AdminActionId,
    pub admin_user_id: Option<AdminUserId>,
    pub admin_email: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A new audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAdminAction {
    pub admin_user_id: AdminUserId,
    pub admin_email: String,
    /// Verb such as `product.update` or `order.status`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
}

/// Record an admin action.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(pool: &PgPool, entry: &NewAdminAction) -> Result<AdminActionId, RepositoryError> {
    let (id,): (AdminActionId,) = sqlx::query_as(
        r"
        INSERT INTO admin_action (admin_user_id, admin_email, action, entity_type, entity_id, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(entry.admin_user_id)
    .bind(&entry.admin_email)
    .bind(&entry.action)
    .bind(&entry.entity_type)
    .bind(entry.entity_id.as_deref())
    .bind(&entry.details)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Most recent actions, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<AdminAction>, RepositoryError> {
    let actions = sqlx::query_as::<_, AdminAction>(
        r"
        SELECT id, admin_user_id, admin_email, action, entity_type, entity_id, details, created_at
        FROM admin_action
        ORDER BY created_at DESC, id DESC
        LIMIT $1
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(actions)
}
