//! Telegram long-polling loop.
//!
//! Updates are fetched one batch at a time and each is handled on its own
//! task, so a slow gateway call for one chat does not hold up the others.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use petal_core::TelegramId;

use crate::dispatcher::{Dispatcher, Inbound};
use crate::gateway::GatewayApi;
use crate::session::SessionStore;
use crate::telegram::TelegramClient;
use crate::telegram::types::Update;

/// Pause after a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Convert an update into a dispatcher event.
///
/// Returns `None` for updates the bot does not handle: group chats, edits,
/// messages without text or contact, and callbacks without data.
#[must_use]
pub fn inbound(update: Update) -> Option<Inbound> {
    if let Some(query) = update.callback_query {
        return query.data.map(|data| Inbound::Callback {
            from: TelegramId::new(query.from.id),
            data,
        });
    }

    let message = update.message?;
    let from = message.from?;
    if message.chat.id != from.id {
        debug!(chat_id = message.chat.id, "Ignoring non-private chat");
        return None;
    }
    let from = TelegramId::new(from.id);

    if let Some(contact) = message.contact {
        return Some(Inbound::Contact {
            from,
            phone: contact.phone_number,
            contact_user: contact.user_id.map(TelegramId::new),
        });
    }
    message.text.map(|text| Inbound::Text { from, text })
}

/// Poll Telegram and dispatch updates until `shutdown` completes.
pub async fn run<G, S>(
    telegram: TelegramClient,
    dispatcher: Arc<Dispatcher<G, S>>,
    shutdown: impl Future<Output = ()>,
) where
    G: GatewayApi + 'static,
    S: SessionStore + 'static,
{
    let mut offset = 0;
    let mut tasks = JoinSet::new();
    tokio::pin!(shutdown);

    info!("Polling Telegram for updates");
    loop {
        let updates = tokio::select! {
            () = &mut shutdown => break,
            result = telegram.get_updates(offset) => result,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let telegram = telegram.clone();
                    let dispatcher = Arc::clone(&dispatcher);
                    tasks.spawn(async move { process(&telegram, &dispatcher, update).await });
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch updates");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                error!(error = %e, "Update handler panicked");
            }
        }
    }

    info!(in_flight = tasks.len(), "Stopping; waiting for in-flight updates");
    while tasks.join_next().await.is_some() {}
}

async fn process<G: GatewayApi, S: SessionStore>(
    telegram: &TelegramClient,
    dispatcher: &Dispatcher<G, S>,
    update: Update,
) {
    let update_id = update.update_id;
    if let Some(query) = &update.callback_query
        && let Err(e) = telegram.answer_callback_query(&query.id).await
    {
        warn!(error = %e, "Failed to answer callback query");
    }

    let Some(event) = inbound(update) else {
        debug!(update_id, "Skipping unsupported update");
        return;
    };

    for outbound in dispatcher.handle(event).await {
        if let Err(e) = telegram
            .send_message(outbound.chat_id, &outbound.reply)
            .await
        {
            error!(error = %e, chat_id = outbound.chat_id, "Failed to send reply");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_text_message() {
        let event = inbound(update(
            r#"{"update_id": 1, "message": {"message_id": 1, "chat": {"id": 42}, "from": {"id": 42, "first_name": "A"}, "text": "/orders"}}"#,
        ));
        assert_eq!(
            event,
            Some(Inbound::Text {
                from: TelegramId::new(42),
                text: "/orders".to_string()
            })
        );
    }

    #[test]
    fn test_contact_message() {
        let event = inbound(update(
            r#"{"update_id": 2, "message": {"message_id": 1, "chat": {"id": 42}, "from": {"id": 42}, "contact": {"phone_number": "79123456789", "first_name": "A", "user_id": 42}}}"#,
        ));
        assert_eq!(
            event,
            Some(Inbound::Contact {
                from: TelegramId::new(42),
                phone: "79123456789".to_string(),
                contact_user: Some(TelegramId::new(42)),
            })
        );
    }

    #[test]
    fn test_callback() {
        let event = inbound(update(
            r#"{"update_id": 3, "callback_query": {"id": "q", "from": {"id": 7}, "data": "confirm_17"}}"#,
        ));
        assert_eq!(
            event,
            Some(Inbound::Callback {
                from: TelegramId::new(7),
                data: "confirm_17".to_string()
            })
        );
    }

    #[test]
    fn test_group_and_empty_updates_are_skipped() {
        assert_eq!(
            inbound(update(
                r#"{"update_id": 4, "message": {"message_id": 1, "chat": {"id": -100}, "from": {"id": 42}, "text": "hi"}}"#,
            )),
            None
        );
        assert_eq!(inbound(update(r#"{"update_id": 5}"#)), None);
    }
}
