//! Per-chat conversation state.
//!
//! Multi-step flows (registration, choosing a delivery address) remember
//! where each chat is between messages. State is keyed by Telegram account
//! and lives in memory; a restart returns every chat to [`ChatState::Idle`].

use async_trait::async_trait;
use dashmap::DashMap;

use petal_core::{ProductId, TelegramId};

/// Where a chat is in a multi-step flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatState {
    /// No flow in progress.
    #[default]
    Idle,
    /// Registration: waiting for the customer's name.
    AwaitingName,
    /// Registration: waiting for a shared contact or typed phone number.
    AwaitingPhone { name: String },
    /// New order: waiting for the saved-or-new address choice.
    ChoosingAddress { product_ids: Vec<ProductId> },
    /// New order: waiting for a typed delivery address.
    AwaitingDeliveryAddress { product_ids: Vec<ProductId> },
}

/// Storage for [`ChatState`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current state, `Idle` when nothing is stored.
    async fn get(&self, chat: TelegramId) -> ChatState;

    /// Replace the state. Storing `Idle` clears the entry.
    async fn set(&self, chat: TelegramId, state: ChatState);

    /// Remove and return the state.
    async fn take(&self, chat: TelegramId) -> ChatState;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessions {
    states: DashMap<TelegramId, ChatState>,
}

impl InMemorySessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chats with a flow in progress.
    #[must_use]
    pub fn active(&self) -> usize {
        self.states.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessions {
    async fn get(&self, chat: TelegramId) -> ChatState {
        self.states
            .get(&chat)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn set(&self, chat: TelegramId, state: ChatState) {
        if state == ChatState::Idle {
            self.states.remove(&chat);
        } else {
            self.states.insert(chat, state);
        }
    }

    async fn take(&self, chat: TelegramId) -> ChatState {
        self.states
            .remove(&chat)
            .map(|(_, state)| state)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_take() {
        let sessions = InMemorySessions::new();
        let chat = TelegramId::new(42);

        assert_eq!(sessions.get(chat).await, ChatState::Idle);

        sessions
            .set(chat, ChatState::AwaitingPhone { name: "Anna".into() })
            .await;
        assert_eq!(
            sessions.get(chat).await,
            ChatState::AwaitingPhone { name: "Anna".into() }
        );
        assert_eq!(sessions.active(), 1);

        assert_eq!(
            sessions.take(chat).await,
            ChatState::AwaitingPhone { name: "Anna".into() }
        );
        assert_eq!(sessions.get(chat).await, ChatState::Idle);
    }

    #[tokio::test]
    async fn test_idle_clears_entry() {
        let sessions = InMemorySessions::new();
        let chat = TelegramId::new(7);
        sessions.set(chat, ChatState::AwaitingName).await;
        sessions.set(chat, ChatState::Idle).await;
        assert_eq!(sessions.active(), 0);
    }

    #[tokio::test]
    async fn test_chats_are_independent() {
        let sessions = InMemorySessions::new();
        sessions.set(TelegramId::new(1), ChatState::AwaitingName).await;
        assert_eq!(sessions.get(TelegramId::new(2)).await, ChatState::Idle);
    }
}
