//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use petal_core::{Role, TelegramId, UserId};

/// A shop account (customer or staff).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Name shown in chat and notifications.
    pub display_name: Option<String>,
    /// Normalized phone number (unique when present).
    pub phone_number: Option<String>,
    /// Linked Telegram account (unique when present).
    pub telegram_id: Option<TelegramId>,
    /// Saved delivery address.
    pub delivery_address: Option<String>,
    /// Role of the account.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name to show in messages, falling back to the username.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Parameters for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub telegram_id: Option<TelegramId>,
    pub role: Role,
}

/// A user together with their API token, handed to the bot.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user: User,
    pub token: String,
}
