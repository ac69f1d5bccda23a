//! API token maintenance.

use petal_gateway::services::UserService;

use super::{CliError, store};

/// Issue a token to every user that has none. Returns how many were issued.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn ensure() -> Result<usize, CliError> {
    let users = UserService::new(store().await?);
    let issued = users.ensure_tokens().await?;
    tracing::info!(issued, "Tokens ensured");
    Ok(issued)
}
