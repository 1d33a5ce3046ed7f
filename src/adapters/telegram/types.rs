//! Bot API payloads
//!
//! Only the fields the bot reads or writes are modelled.

use serde::{Deserialize, Serialize};

use crate::domain::format::texts;
use crate::domain::recipient::ChatId;
use crate::ports::messenger::{CALLBACK_SUBSCRIBE, CALLBACK_UNSUBSCRIBE};
use crate::ports::{InboundEvent, Keyboard};

/// Envelope around every Bot API result
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Reduce an update to the event the bot cares about, if any
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(message) = self.message {
            let text = message.text?;
            return Some(InboundEvent::Message {
                chat: ChatId(message.chat.id),
                text,
            });
        }

        let query = self.callback_query?;
        // Callbacks on messages too old to be delivered carry no chat
        let chat = query.message.as_ref().map(|m| ChatId(m.chat.id))?;
        Some(InboundEvent::Callback {
            chat,
            callback_id: query.id,
            data: query.data.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Reply {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
    },
    Inline {
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
}

fn button(text: &str) -> KeyboardButton {
    KeyboardButton { text: text.to_string() }
}

fn inline(text: &str, data: &str) -> InlineKeyboardButton {
    InlineKeyboardButton {
        text: text.to_string(),
        callback_data: data.to_string(),
    }
}

/// Telegram markup for an abstract keyboard
pub fn markup_for(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::MainMenu => ReplyMarkup::Reply {
            keyboard: vec![
                vec![button(texts::BUTTON_CBR), button(texts::BUTTON_NBK)],
                vec![button(texts::BUTTON_OTHER)],
                vec![button(texts::BUTTON_SUBSCRIPTION)],
            ],
            resize_keyboard: true,
        },
        Keyboard::SubscriptionMenu => ReplyMarkup::Inline {
            inline_keyboard: vec![
                vec![inline(texts::BUTTON_SUBSCRIBE, CALLBACK_SUBSCRIBE)],
                vec![inline(texts::BUTTON_UNSUBSCRIBE, CALLBACK_UNSUBSCRIBE)],
            ],
        },
    }
}

/// `sendMessage` request body
#[derive(Debug, Serialize)]
pub(crate) struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    pub parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

/// `getUpdates` request body
#[derive(Debug, Serialize)]
pub(crate) struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: [&'static str; 2],
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerCallbackQuery<'a> {
    pub callback_query_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_update_into_event() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": 123, "type": "private"},
                "from": {"id": 123, "is_bot": false, "first_name": "A"},
                "date": 1700000000,
                "text": "/start"
            }
        }))
        .unwrap();

        assert_eq!(
            update.into_event(),
            Some(InboundEvent::Message { chat: ChatId(123), text: "/start".into() })
        );
    }

    #[test]
    fn test_callback_update_into_event() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 11,
            "callback_query": {
                "id": "cbq-1",
                "from": {"id": 123, "is_bot": false, "first_name": "A"},
                "message": {"message_id": 6, "chat": {"id": 123}, "date": 1700000000},
                "chat_instance": "x",
                "data": "subscribe"
            }
        }))
        .unwrap();

        assert_eq!(
            update.into_event(),
            Some(InboundEvent::Callback {
                chat: ChatId(123),
                callback_id: "cbq-1".into(),
                data: "subscribe".into(),
            })
        );
    }

    #[test]
    fn test_non_text_message_is_ignored() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 12,
            "message": {"message_id": 7, "chat": {"id": 1}, "sticker": {}}
        }))
        .unwrap();
        assert_eq!(update.into_event(), None);
    }

    #[test]
    fn test_main_menu_markup_layout() {
        let value = serde_json::to_value(markup_for(Keyboard::MainMenu)).unwrap();
        assert_eq!(
            value,
            json!({
                "keyboard": [
                    [{"text": "📊 Курс ЦБ РФ"}, {"text": "📊 Курс НБ РК"}],
                    [{"text": "🌍 Остальные валюты"}],
                    [{"text": "🔔 Подписка на уведомления"}]
                ],
                "resize_keyboard": true
            })
        );
    }

    #[test]
    fn test_subscription_markup_callbacks() {
        let value = serde_json::to_value(markup_for(Keyboard::SubscriptionMenu)).unwrap();
        assert_eq!(value["inline_keyboard"][0][0]["callback_data"], "subscribe");
        assert_eq!(value["inline_keyboard"][1][0]["callback_data"], "unsubscribe");
    }

    #[test]
    fn test_error_envelope() {
        let response: ApiResponse<Message> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        }))
        .unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(403));
    }
}
