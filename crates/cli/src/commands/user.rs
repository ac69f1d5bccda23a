//! User provisioning.

use petal_core::{Role, TelegramId, UserId};
use petal_gateway::models::Identity;
use petal_gateway::services::UserService;

use super::{CliError, store};

/// Create a user and return it with its API token.
///
/// # Errors
///
/// Returns an error for an unknown role, a taken username or phone, or a
/// store failure.
pub async fn create(username: &str, role: &str, phone: Option<&str>) -> Result<Identity, CliError> {
    let role: Role = role
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("role {role}; valid roles: customer, staff, admin")))?;

    tracing::info!("Creating user: {} ({})", username, role);
    let users = UserService::new(store().await?);
    Ok(users.create(username, role, phone).await?)
}

/// Link a chat account to any user, staff and admin included.
///
/// # Errors
///
/// Returns an error for an unknown user, an account or chat already linked
/// elsewhere, or a store failure.
pub async fn link(user_id: i32, telegram_id: i64) -> Result<Identity, CliError> {
    tracing::info!(user_id, telegram_id, "Linking chat account");
    let users = UserService::new(store().await?);
    Ok(users
        .assign_telegram(TelegramId::new(telegram_id), UserId::new(user_id))
        .await?)
}
