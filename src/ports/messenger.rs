//! Chat platform port
//!
//! The core only sees abstract inbound events and an outbound send that can
//! fail per recipient. Transport details stay in the adapter.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recipient::ChatId;

#[derive(Error, Debug, Clone)]
pub enum SendError {
    #[error("Recipient {0} is unreachable: {1}")]
    Unreachable(ChatId, String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Callback data carried by the inline subscription buttons
pub const CALLBACK_SUBSCRIBE: &str = "subscribe";
pub const CALLBACK_UNSUBSCRIBE: &str = "unsubscribe";

/// Keyboard attached to an outgoing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent reply keyboard with the rate and subscription buttons
    MainMenu,
    /// Inline subscribe/unsubscribe buttons
    SubscriptionMenu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Inbound event from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Text message or reply-keyboard button press
    Message { chat: ChatId, text: String },
    /// Inline button press
    Callback {
        chat: ChatId,
        callback_id: String,
        data: String,
    },
}

impl InboundEvent {
    pub fn chat(&self) -> ChatId {
        match self {
            InboundEvent::Message { chat, .. } | InboundEvent::Callback { chat, .. } => *chat,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> Result<(), SendError>;

    /// Stop the client-side spinner on an inline button
    async fn acknowledge(&self, callback_id: &str) -> Result<(), SendError>;
}
