//! Admin action audit log.
//!
//! Every write route records who did what to which entity. Recording never
//! blocks or fails the request: the insert runs on a background task and a
//! failure is only logged.

use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, warn};

use zolar_db::admin_users::AdminUser;
use zolar_db::admin_actions::{self, NewAdminAction};

/// Fire-and-forget writer for `admin_action` rows.
#[derive(Clone)]
pub struct AuditLogger {
    pool: PgPool,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

impl AuditLogger {
    /// Create an audit logger writing to `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an action taken by `admin`.
    ///
    /// `action` is a dotted verb such as `product.update`.
    pub fn record(
        &self,
        admin: &AdminUser,
        action: &str,
        entity_type: &str,
        entity_id: Option<String>,
        details: Value,
    ) {
        let entry = entry(admin, action, entity_type, entity_id, details);
        let pool = self.pool.clone();
        tokio::spawn(async move {
            write(&pool, &entry).await;
        });
    }
}

/// Insert one entry. Returns whether it was stored; failures are logged.
async fn write(pool: &PgPool, entry: &NewAdminAction) -> bool {
    match admin_actions::insert(pool, entry).await {
        Ok(id) => {
            debug!(action_id = %id, action = %entry.action, "Admin action recorded");
            true
        }
        Err(e) => {
            warn!(
                error = %e,
                action = %entry.action,
                admin = %entry.admin_email,
                "Failed to record admin action"
            );
            false
        }
    }
}

fn entry(
    admin: &AdminUser,
    action: &str,
    entity_type: &str,
    entity_id: Option<String>,
    details: Value,
) -> NewAdminAction {
    NewAdminAction {
        admin_user_id: admin.id,
        admin_email: admin.email.to_string(),
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id,
        details,
    }
}
