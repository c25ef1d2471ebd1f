//! Authentication extractors for admin.
//!
//! Admins send `Authorization: Bearer <token>`. The token's SHA-256 hex digest
//! is looked up in `admin_user.token_hash`; the plaintext is never stored.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn protected_handler(RequireWriter(admin): RequireWriter) -> impl IntoResponse {
//!     format!("Hello, {}!", admin.name)
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use zolar_core::AdminRole;
use zolar_db::AdminUserRepository;
use zolar_db::admin_users::{AdminUser, hash_token};

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Any authenticated admin, including viewers.
pub struct RequireAdmin(pub AdminUser);

/// An admin allowed to change data (`admin` or `super_admin`).
pub struct RequireWriter(pub AdminUser);

/// A super admin. Required for managing other admins.
pub struct RequireSuperAdmin(pub AdminUser);

/// Extract the token from an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the caller, once per request.
async fn authenticate(parts: &mut Parts, state: &AppState) -> Result<AdminUser, AppError> {
    if let Some(admin) = parts.extensions.get::<AdminUser>() {
        return Ok(admin.clone());
    }

    let token = bearer_token(parts)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    let admin = AdminUserRepository::new(state.pool())
        .authenticate(&hash_token(token))
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid token".to_string()))?;

    set_sentry_user(admin.id.as_i32(), Some(admin.email.as_str()));
    tracing::Span::current().record("admin_id", admin.id.as_i32());
    parts.extensions.insert(admin.clone());
    Ok(admin)
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireWriter {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let admin = authenticate(parts, state).await?;
        if !admin.role.can_write() {
            return Err(AppError::Forbidden("read-only account".to_string()));
        }
        Ok(Self(admin))
    }
}

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let admin = authenticate(parts, state).await?;
        if admin.role != AdminRole::SuperAdmin {
            return Err(AppError::Forbidden(
                "only super admins can access this resource".to_string(),
            ));
        }
        Ok(Self(admin))
    }
}
