//! Petal CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply gateway migrations
//! petal-cli migrate
//!
//! # Create one product per photo in a directory
//! petal-cli seed products --dir media/products --price 100.00
//!
//! # Create a staff account and print its API token
//! petal-cli user create -u florist -r staff
//!
//! # Link a staff member's Telegram chat
//! petal-cli user link --user-id 3 --telegram-id 123456789
//!
//! # Issue tokens to users that have none
//! petal-cli tokens ensure
//!
//! # Generate a sales report for the last 30 days
//! petal-cli report generate --days 30
//!
//! # Export the sales CSV
//! petal-cli report export --out sales.csv
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "petal-cli")]
#[command(author, version, about = "Petal CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage API tokens
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
    /// Sales reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create a product for every `.jpg` in a directory
    Products {
        /// Directory with product photos
        #[arg(short, long, default_value = "media/products")]
        dir: PathBuf,

        /// Price for every created product
        #[arg(short, long, default_value = "100.00")]
        price: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user and print its API token
    Create {
        /// Unique login name
        #[arg(short, long)]
        username: String,

        /// Role (`customer`, `staff`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,
    },
    /// Link a Telegram chat to a user (any role)
    Link {
        /// User ID
        #[arg(long)]
        user_id: i32,

        /// Telegram chat ID
        #[arg(long)]
        telegram_id: i64,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Issue tokens for every user without one
    Ensure,
}

#[derive(Subcommand)]
enum ReportAction {
    /// Generate and store a snapshot
    Generate {
        /// Window length in days, ending today
        #[arg(short, long, default_value_t = 30)]
        days: u64,
    },
    /// Export the last 30 days of orders as CSV
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { dir, price } => {
                let created = commands::seed::products(&dir, &price).await?;
                println!("Created {created} products");
            }
        },
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                role,
                phone,
            } => {
                let identity =
                    commands::user::create(&username, &role, phone.as_deref()).await?;
                println!("User #{} created", identity.user.id);
                println!("Token: {}", identity.token);
            }
            UserAction::Link {
                user_id,
                telegram_id,
            } => {
                let identity = commands::user::link(user_id, telegram_id).await?;
                println!(
                    "Chat {telegram_id} linked to {} ({})",
                    identity.user.username, identity.user.role
                );
            }
        },
        Commands::Tokens { action } => match action {
            TokensAction::Ensure => {
                let issued = commands::tokens::ensure().await?;
                println!("Issued {issued} tokens");
            }
        },
        Commands::Report { action } => match action {
            ReportAction::Generate { days } => match commands::report::generate(days).await? {
                Some(report) => println!(
                    "Report #{}: {} orders, revenue {}",
                    report.id, report.figures.total_orders, report.figures.total_revenue
                ),
                None => println!("No orders in the last {days} days; no report stored"),
            },
            ReportAction::Export { out } => {
                if let Some(csv) = commands::report::export(out.as_deref()).await? {
                    print!("{csv}");
                }
            }
        },
    }
    Ok(())
}
