//! Database migration command.
//!
//! Migrations live in `crates/gateway/migrations/` and are embedded at
//! compile time. The gateway never runs them on startup.

use super::{CliError, connect};

/// Apply pending gateway migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running gateway migrations...");
    sqlx::migrate!("../gateway/migrations").run(&pool).await?;

    tracing::info!("Gateway migrations complete!");
    Ok(())
}
