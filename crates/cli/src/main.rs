//! Omoide Uriba CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! omoide-cli migrate
//!
//! # Grant the ADMIN role
//! omoide-cli admin promote --email staff@example.com
//! omoide-cli admin promote --first
//!
//! # List accounts and roles
//! omoide-cli admin list
//!
//! # Insert the default categories
//! omoide-cli seed categories
//! ```
//!
//! All commands read `DATABASE_URL` (a `.env` file is loaded if present).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "omoide-cli")]
#[command(author, version, about = "Omoide Uriba CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Insert reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the ADMIN role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long, conflicts_with = "first", required_unless_present = "first")]
        email: Option<String>,

        /// Promote the oldest account instead
        #[arg(long)]
        first: bool,
    },
    /// List accounts with their roles
    List,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert or rename the default categories
    Categories,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email, first } => {
                commands::admin::promote(email.as_deref(), first).await?;
            }
            AdminAction::List => commands::admin::list().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Categories => commands::seed::categories().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_promote_needs_a_target() {
        assert!(Cli::try_parse_from(["omoide-cli", "admin", "promote"]).is_err());
        assert!(
            Cli::try_parse_from(["omoide-cli", "admin", "promote", "--first", "-e", "a@b.jp"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["omoide-cli", "admin", "promote", "--first"]).is_ok());
        assert!(
            Cli::try_parse_from(["omoide-cli", "admin", "promote", "--email", "a@b.jp"]).is_ok()
        );
    }
}
