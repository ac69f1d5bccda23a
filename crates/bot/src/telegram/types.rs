//! Bot API wire types.
//!
//! Only the fields the bot reads or sends are modeled.
//!
//! See: <https://core.telegram.org/bots/api>

use serde::{Deserialize, Serialize};

use crate::reply::{Keyboard, Reply};

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub contact: Option<Contact>,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A Telegram account.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
}

/// A shared phone contact.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    /// Set when the contact belongs to a Telegram account.
    pub user_id: Option<i64>,
}

/// A button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
    pub message: Option<Message>,
}

/// `getUpdates` parameters.
#[derive(Debug, Serialize)]
pub struct GetUpdates {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: &'static [&'static str],
}

/// `sendMessage` parameters.
#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

/// `answerCallbackQuery` parameters.
#[derive(Debug, Serialize)]
pub struct AnswerCallbackQuery<'a> {
    pub callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
}

/// Keyboard markup attached to a message.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline {
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        one_time_keyboard: bool,
        resize_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
}

/// An inline button carrying callback data.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

/// A reply-keyboard button.
#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    pub request_contact: bool,
}

impl From<&Keyboard> for ReplyMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        match keyboard {
            Keyboard::Inline(rows) => Self::Inline {
                inline_keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|b| InlineKeyboardButton {
                                text: b.text.clone(),
                                callback_data: b.data.clone(),
                            })
                            .collect()
                    })
                    .collect(),
            },
            Keyboard::RequestContact(label) => Self::Keyboard {
                keyboard: vec![vec![KeyboardButton {
                    text: label.clone(),
                    request_contact: true,
                }]],
                one_time_keyboard: true,
                resize_keyboard: true,
            },
            Keyboard::Remove => Self::Remove {
                remove_keyboard: true,
            },
        }
    }
}

impl<'a> SendMessage<'a> {
    /// Build `sendMessage` parameters for a reply.
    #[must_use]
    pub fn from_reply(chat_id: i64, reply: &'a Reply) -> Self {
        Self {
            chat_id,
            text: &reply.text,
            reply_markup: reply.keyboard.as_ref().map(ReplyMarkup::from),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reply::Button;

    #[test]
    fn test_inline_keyboard_serialization() {
        let reply = Reply::text("Order #17").with_buttons(vec![vec![Button::new(
            "✅ Confirm",
            "confirm_17",
        )]]);
        let json = serde_json::to_value(SendMessage::from_reply(5, &reply)).unwrap();
        assert_eq!(json["chat_id"], 5);
        assert_eq!(
            json["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            "confirm_17"
        );
    }

    #[test]
    fn test_contact_keyboard_serialization() {
        let reply = Reply::text("Phone?").with_keyboard(Keyboard::RequestContact("📱 Share".into()));
        let json = serde_json::to_value(SendMessage::from_reply(5, &reply)).unwrap();
        assert_eq!(json["reply_markup"]["keyboard"][0][0]["request_contact"], true);
        assert_eq!(json["reply_markup"]["one_time_keyboard"], true);
    }

    #[test]
    fn test_plain_reply_has_no_markup() {
        let reply = Reply::text("hi");
        let json = serde_json::to_value(SendMessage::from_reply(5, &reply)).unwrap();
        assert!(json.get("reply_markup").is_none());
    }

    #[test]
    fn test_update_deserialization() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 10,
                "callback_query": {
                    "id": "abc",
                    "from": {"id": 42, "is_bot": false, "first_name": "Anna"},
                    "data": "confirm_17",
                    "message": {"message_id": 3, "chat": {"id": 42, "type": "private"}, "date": 0}
                }
            }"#,
        )
        .unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.from.id, 42);
        assert_eq!(query.data.as_deref(), Some("confirm_17"));
        assert_eq!(query.message.unwrap().chat.id, 42);
    }
}
