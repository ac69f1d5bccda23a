//! Command implementations.
//!
//! Every command connects to the gateway's `PostgreSQL` database using
//! `GATEWAY_DATABASE_URL` (falling back to `DATABASE_URL`).

pub mod migrate;
pub mod report;
pub mod seed;
pub mod tokens;
pub mod user;

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use petal_gateway::db::{self, OrderStore, PgStore, RepositoryError};
use petal_gateway::error::AppError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),

    /// The operation was rejected by the gateway services.
    #[error("{0}")]
    App(#[from] AppError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command-line input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Connect to the gateway database.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("GATEWAY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("GATEWAY_DATABASE_URL"))?;

    tracing::info!("Connecting to gateway database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Connect and wrap the pool in the order store.
pub async fn store() -> Result<Arc<dyn OrderStore>, CliError> {
    Ok(Arc::new(PgStore::new(connect().await?)))
}
