//! Outgoing chat messages, independent of the chat platform.

/// A button that sends `data` back as a callback when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    /// Create a callback button.
    #[must_use]
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Keyboard attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Inline buttons, one inner `Vec` per row.
    Inline(Vec<Vec<Button>>),
    /// One-off keyboard asking the user to share their phone contact.
    RequestContact(String),
    /// Hide a previously shown reply keyboard.
    Remove,
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    /// Plain text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    /// Attach a keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Attach inline buttons, skipping empty rows; no keyboard if all are empty.
    #[must_use]
    pub fn with_buttons(mut self, rows: Vec<Vec<Button>>) -> Self {
        let rows: Vec<Vec<Button>> = rows.into_iter().filter(|r| !r.is_empty()).collect();
        if !rows.is_empty() {
            self.keyboard = Some(Keyboard::Inline(rows));
        }
        self
    }

    /// Callback data of every inline button, in order.
    #[must_use]
    pub fn button_data(&self) -> Vec<&str> {
        match &self.keyboard {
            Some(Keyboard::Inline(rows)) => rows
                .iter()
                .flatten()
                .map(|b| b.data.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A reply addressed to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub chat_id: i64,
    pub reply: Reply,
}
