//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! zolar-cli admin create -e admin@zolar.store -n "Admin Name" -r super_admin
//! ```
//!
//! The bearer token is printed once and never stored; only its SHA-256 hash
//! reaches the database. Further admins can be created from the dashboard
//! by a super admin.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use thiserror::Error;

use zolar_core::{AdminRole, Email};
use zolar_db::AdminUserRepository;
use zolar_db::admin_users::{generate_token, hash_token};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Display name is blank.
    #[error("Name must not be empty")]
    EmptyName,
}

/// Validated arguments for `admin create`.
#[derive(Debug)]
struct NewAdmin {
    email: Email,
    name: String,
    role: AdminRole,
}

fn parse_args(email: &str, name: &str, role: &str) -> Result<NewAdmin, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::EmptyName);
    }
    Ok(NewAdmin {
        email,
        name: name.to_owned(),
        role,
    })
}

/// Create a new admin user and print their bearer token.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `role` - Admin's role (`super_admin`, `admin`, or `viewer`)
///
/// # Errors
///
/// Returns an error for invalid arguments, a duplicate email, or a database
/// failure.
pub async fn create_user(email: &str, name: &str, role: &str) -> Result<(), Box<dyn std::error::Error>> {
    let admin = parse_args(email, name, role)?;
    let pool = super::connect().await?;

    tracing::info!("Creating admin user: {} ({})", admin.email, admin.role);

    let token = generate_token();
    let user = AdminUserRepository::new(&pool)
        .create(&admin.email, &admin.name, admin.role, &hash_token(&token))
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    #[allow(clippy::print_stdout)]
    {
        println!();
        println!("Bearer token for {} (shown once, store it now):", user.email);
        println!("  {token}");
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let admin = parse_args("Ops@Zolar.store", "  Ops  ", "super_admin").unwrap();
        assert_eq!(admin.email.as_str(), "ops@zolar.store");
        assert_eq!(admin.name, "Ops");
        assert_eq!(admin.role, AdminRole::SuperAdmin);
    }

    #[test]
    fn test_parse_args_rejects_invalid() {
        assert!(matches!(
            parse_args("ops@zolar.store", "Ops", "owner"),
            Err(AdminError::InvalidRole(_))
        ));
        assert!(matches!(
            parse_args("not-an-email", "Ops", "admin"),
            Err(AdminError::InvalidEmail(_))
        ));
        assert!(matches!(
            parse_args("ops@zolar.store", " ", "admin"),
            Err(AdminError::EmptyName)
        ));
    }
}
