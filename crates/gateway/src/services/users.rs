//! User service: bearer tokens, chat-account identities and saved addresses.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{info, instrument, warn};

use petal_core::{PhoneNumber, Role, TelegramId, UserId};

use super::orders::normalize_address;
use crate::db::{OrderStore, RepositoryError};
use crate::error::AppError;
use crate::models::{Identity, NewUser, User};

/// Length of generated API tokens.
pub const TOKEN_LENGTH: usize = 40;

/// Maximum length of a display name.
const MAX_NAME_LEN: usize = 150;

/// Generate a random alphanumeric API token.
#[must_use]
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// User service.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn OrderStore>,
}

impl UserService {
    /// Create a user service.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for an unknown token.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        self.store
            .find_user_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid token".to_string()))
    }

    /// The user's token, issuing one if they have none.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    #[instrument(skip(self))]
    pub async fn token_for(&self, user_id: UserId) -> Result<String, AppError> {
        Ok(self.store.issue_token(user_id, &generate_token()).await?)
    }

    /// Issue tokens for every user without one. Returns how many were issued.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    #[instrument(skip(self))]
    pub async fn ensure_tokens(&self) -> Result<usize, AppError> {
        let users = self.store.list_users_without_token().await?;
        for user in &users {
            self.token_for(user.id).await?;
            info!(user_id = %user.id, username = %user.username, "Token issued");
        }
        Ok(users.len())
    }

    /// Create an account and issue its token.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank username or malformed phone, and
    /// `Conflict` if the username or phone is taken.
    #[instrument(skip(self, phone))]
    pub async fn create(
        &self,
        username: &str,
        role: Role,
        phone: Option<&str>,
    ) -> Result<Identity, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("username must not be blank".to_string()));
        }
        let phone_number = phone.map(parse_phone).transpose()?;

        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                display_name: None,
                phone_number,
                telegram_id: None,
                role,
            })
            .await?;
        info!(user_id = %user.id, role = %user.role, "User created");
        self.identity(user).await
    }

    /// The identity linked to a chat account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no user is linked to `telegram_id`.
    #[instrument(skip(self))]
    pub async fn identity_for_telegram(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Identity, AppError> {
        let user = self
            .store
            .find_user_by_telegram(telegram_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user for telegram account {telegram_id}")))?;
        self.identity(user).await
    }

    /// Register a customer from the chat registration flow.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name or malformed phone, and
    /// `Conflict` if the chat account or phone is already registered.
    #[instrument(skip(self, name, phone))]
    pub async fn register_telegram(
        &self,
        telegram_id: TelegramId,
        name: &str,
        phone: &str,
    ) -> Result<Identity, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name must not be blank".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        let phone_number = parse_phone(phone)?;

        let user = self
            .store
            .create_user(NewUser {
                username: format!("tg{telegram_id}"),
                display_name: Some(name.to_string()),
                phone_number: Some(phone_number),
                telegram_id: Some(telegram_id),
                role: Role::Customer,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AppError::Conflict("phone number or chat account already registered".to_string())
                }
                other => other.into(),
            })?;
        info!(user_id = %user.id, "Registered from chat");
        self.identity(user).await
    }

    /// Link a chat account to an existing customer account.
    ///
    /// Staff and admin accounts are only linked through
    /// [`UserService::assign_telegram`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, `Forbidden` for a staff or
    /// admin account and `Conflict` if either side is already linked
    /// elsewhere.
    #[instrument(skip(self))]
    pub async fn link_telegram(
        &self,
        telegram_id: TelegramId,
        user_id: UserId,
    ) -> Result<Identity, AppError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
        if user.role != Role::Customer {
            warn!(%user_id, role = %user.role, "Refused chat link to privileged account");
            return Err(AppError::Forbidden(
                "staff accounts are linked by an administrator".to_string(),
            ));
        }
        self.attach(telegram_id, user_id).await
    }

    /// Link a chat account to any user, whatever its role.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user and `Conflict` if either side
    /// is already linked elsewhere.
    #[instrument(skip(self))]
    pub async fn assign_telegram(
        &self,
        telegram_id: TelegramId,
        user_id: UserId,
    ) -> Result<Identity, AppError> {
        self.attach(telegram_id, user_id).await
    }

    async fn attach(&self, telegram_id: TelegramId, user_id: UserId) -> Result<Identity, AppError> {
        let user = self
            .store
            .link_telegram(user_id, telegram_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AppError::NotFound(format!("user {user_id}")),
                RepositoryError::Conflict(_) => AppError::Conflict(
                    "account or chat is already linked elsewhere".to_string(),
                ),
                other => other.into(),
            })?;
        info!(user_id = %user.id, "Chat account linked");
        self.identity(user).await
    }

    /// Replace the user's saved delivery address.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank or overlong address.
    #[instrument(skip(self, user, address), fields(user_id = %user.id))]
    pub async fn save_address(&self, user: &User, address: &str) -> Result<User, AppError> {
        let address = normalize_address(address)?;
        Ok(self.store.set_delivery_address(user.id, &address).await?)
    }

    async fn identity(&self, user: User) -> Result<Identity, AppError> {
        let token = self.token_for(user.id).await?;
        Ok(Identity { user, token })
    }
}

fn parse_phone(phone: &str) -> Result<String, AppError> {
    PhoneNumber::parse(phone)
        .map(PhoneNumber::into_inner)
        .map_err(|e| AppError::Validation(format!("invalid phone number: {e}")))
}
