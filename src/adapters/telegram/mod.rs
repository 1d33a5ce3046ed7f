//! Telegram Adapter
//!
//! Bot API client over plain HTTPS:
//! - `getUpdates` long polling turned into `InboundEvent`s
//! - `sendMessage` with HTML parse mode and the bot's keyboards
//! - `answerCallbackQuery` for inline buttons

mod client;
mod types;

pub use client::{TelegramClient, TelegramConfig, TelegramError, DEFAULT_API_URL};
pub use types::{
    ApiResponse, CallbackQuery, Chat, InlineKeyboardButton, KeyboardButton, Message, ReplyMarkup,
    Update, User, markup_for,
};
