//! Wildcurrant CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! wcr-cli migrate storefront
//!
//! # Run functions database migrations
//! wcr-cli migrate functions
//!
//! # Run all database migrations
//! wcr-cli migrate all
//!
//! # Grant the admin role to an auth backend account
//! wcr-cli roles grant -a 7c9e4f0a-... -r admin
//!
//! # Review wholesale applications
//! wcr-cli wholesale list --status pending
//! wcr-cli wholesale approve 7c9e4f0a-...
//!
//! # Clear one recipe cache row so the pair can be regenerated
//! wcr-cli cache clear-recipe -p lingon-spritz -o "summer solstice"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `roles` - Manage role grants for the functions admin gate
//! - `wholesale` - Review wholesale applications
//! - `cache` - Clear generated-artifact cache rows

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "wcr-cli")]
#[command(author, version, about = "Wildcurrant CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage role grants for the functions admin gate
    Roles {
        #[command(subcommand)]
        action: RolesAction,
    },
    /// Review wholesale applications
    Wholesale {
        #[command(subcommand)]
        action: WholesaleAction,
    },
    /// Clear generated-artifact cache rows
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
    /// Run functions database migrations
    Functions,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum RolesAction {
    /// Grant a role to an auth backend account
    Grant {
        /// Auth backend account id
        #[arg(short, long)]
        account: Uuid,

        /// Role name (`admin`, `wholesale`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
    /// Revoke a role from an account
    Revoke {
        /// Auth backend account id
        #[arg(short, long)]
        account: Uuid,

        /// Role name (`admin`, `wholesale`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
    /// List role grants
    List {
        /// Limit to one account
        #[arg(short, long)]
        account: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum WholesaleAction {
    /// List applications
    List {
        /// Filter by status (`pending`, `approved`, `rejected`)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show one application in full
    Show {
        /// Application id
        id: Uuid,
    },
    /// Approve a pending application
    Approve {
        /// Application id
        id: Uuid,
    },
    /// Reject a pending application
    Reject {
        /// Application id
        id: Uuid,
    },
    /// List the synced customer roster
    Customers,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete one recipe cache row so the pair can be regenerated
    ClearRecipe {
        /// Product id
        #[arg(short, long)]
        product: String,

        /// Occasion
        #[arg(short, long)]
        occasion: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Functions => commands::migrate::functions().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::functions().await?;
            }
        },
        Commands::Roles { action } => match action {
            RolesAction::Grant { account, role } => {
                commands::roles::grant(account, &role).await?;
            }
            RolesAction::Revoke { account, role } => {
                commands::roles::revoke(account, &role).await?;
            }
            RolesAction::List { account } => commands::roles::list(account).await?,
        },
        Commands::Wholesale { action } => match action {
            WholesaleAction::List { status } => {
                commands::wholesale::list(status.as_deref()).await?;
            }
            WholesaleAction::Show { id } => commands::wholesale::show(id).await?,
            WholesaleAction::Approve { id } => commands::wholesale::approve(id).await?,
            WholesaleAction::Reject { id } => commands::wholesale::reject(id).await?,
            WholesaleAction::Customers => commands::wholesale::customers().await?,
        },
        Commands::Cache { action } => match action {
            CacheAction::ClearRecipe { product, occasion } => {
                commands::cache::clear_recipe(&product, &occasion).await?;
            }
        },
    }
    Ok(())
}
