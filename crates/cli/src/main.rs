//! Ordering CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ord-cli migrate
//!
//! # Create a shop account
//! ord-cli user create -e shop@example.com -p 'long password' -r shop
//!
//! # Import a YAML catalog on behalf of a shop account
//! ord-cli import -e shop@example.com -f data/shop1.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create buyer or shop accounts
//! - `import` - Import a supplier catalog file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ord-cli")]
#[command(author, version, about = "Ordering service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Import a YAML catalog for a shop account
    Import {
        /// Email of the shop account that owns the catalog
        #[arg(short, long)]
        email: String,

        /// Path to the YAML document
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Account role (`buyer`, `shop`)
        #[arg(short, long, default_value = "buyer")]
        role: String,

        /// Given name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "")]
        last_name: String,

        /// Company name
        #[arg(long, default_value = "")]
        company: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                role,
                first_name,
                last_name,
                company,
            } => {
                let profile = ordering_service::models::Profile {
                    first_name,
                    last_name,
                    company,
                    ..Default::default()
                };
                commands::user::create(&email, &password, &role, &profile).await?;
            }
        },
        Commands::Import { email, file } => {
            commands::import::run(&email, &file).await?;
        }
    }
    Ok(())
}
