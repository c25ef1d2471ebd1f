//! ZOLAR CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! zolar-cli migrate
//!
//! # Create an admin user (prints a one-time bearer token)
//! zolar-cli admin create -e admin@zolar.store -n "Admin Name" -r super_admin
//!
//! # Load a demo catalog, hero slides and social links
//! zolar-cli seed
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "zolar-cli")]
#[command(author, version, about = "ZOLAR CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed demo catalog and content
    Seed,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "zolar_cli=info,zolar_db=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name, role } => {
                commands::admin::create_user(&email, &name, &role).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_create() {
        let cli = Cli::try_parse_from([
            "zolar-cli", "admin", "create", "-e", "ops@zolar.store", "-n", "Ops", "-r", "viewer",
        ])
        .map_err(|e| e.to_string());
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Admin {
                action: AdminAction::Create { ref role, .. }
            }) if role == "viewer"
        ));
    }
}
