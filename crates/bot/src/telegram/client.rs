//! Telegram Bot API client.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use super::error::TelegramError;
use super::types::{AnswerCallbackQuery, ApiResponse, GetUpdates, SendMessage, Update};
use crate::reply::Reply;

/// Telegram Bot API base URL.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Update kinds the bot asks for.
const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram API client for polling updates and sending messages.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    /// Bot token; part of every method URL.
    token: SecretString,
    /// Long-poll timeout for `getUpdates`.
    poll_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("token", &"[REDACTED]")
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new Telegram client.
    #[must_use]
    pub fn new(token: SecretString, poll_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            token,
            poll_timeout,
        }
    }

    /// Long-poll for updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Telegram returns an error.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdates {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params, Some(self.poll_timeout + POLL_GRACE))
            .await
    }

    /// Send a reply to a chat.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Telegram returns an error.
    #[instrument(skip(self, reply), fields(chat_id = %chat_id))]
    pub async fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessage::from_reply(chat_id, reply), None)
            .await?;
        debug!("Message sent to Telegram");
        Ok(())
    }

    /// Stop the loading indicator on a pressed button.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Telegram returns an error.
    pub async fn answer_callback_query(&self, id: &str) -> Result<(), TelegramError> {
        let params = AnswerCallbackQuery {
            callback_query_id: id,
            text: None,
        };
        let _: bool = self.call("answerCallbackQuery", &params, None).await?;
        Ok(())
    }

    async fn call<P, T>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<Duration>,
    ) -> Result<T, TelegramError>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!(
            "{TELEGRAM_API_BASE}/bot{}/{method}",
            self.token.expose_secret()
        );
        let mut request = self.client.post(url).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // The URL carries the token, so it is stripped from errors.
        let response = request
            .send()
            .await
            .map_err(|e| TelegramError::Request(e.without_url().to_string()))?;

        let result: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Response(e.without_url().to_string()))?;

        if !result.ok {
            error!(method, error = ?result.description, "Telegram API error");
            return Err(TelegramError::Api(
                result
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        result
            .result
            .ok_or_else(|| TelegramError::Response(format!("{method}: missing result")))
    }
}
