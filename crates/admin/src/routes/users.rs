//! Admin account routes.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use zolar_core::{AdminRole, AdminUserId, Email};
use zolar_db::AdminUserRepository;
use zolar_db::admin_users::{generate_token, hash_token};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::{RequireAdmin, RequireSuperAdmin};
use crate::state::AppState;

/// The calling admin.
pub async fn me(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
    Json(admin)
}

/// List all admins.
pub async fn index(
    RequireSuperAdmin(_admin): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let users = AdminUserRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "users": users })))
}

/// New admin request body.
#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub name: String,
    pub role: AdminRole,
}

/// Create an admin. The plaintext token is in this response and nowhere else.
#[instrument(skip(state, admin, request), fields(admin_id = %admin.id))]
pub async fn create(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(request): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let token = generate_token();
    let user = AdminUserRepository::new(state.pool())
        .create(&email, name, request.role, &hash_token(&token))
        .await?;

    state.audit().record(
        &admin,
        "admin_user.create",
        "admin_user",
        Some(user.id.to_string()),
        json!({ "email": user.email, "role": user.role }),
    );
    Ok((StatusCode::CREATED, Json(json!({ "user": user, "token": token }))))
}

/// Remove an admin. Admins cannot remove themselves.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<impl IntoResponse> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "you cannot delete your own account".to_string(),
        ));
    }
    AdminUserRepository::new(state.pool()).delete(id).await?;

    state.audit().record(
        &admin,
        "admin_user.delete",
        "admin_user",
        Some(id.to_string()),
        serde_json::Value::Null,
    );
    Ok(StatusCode::NO_CONTENT)
}
