use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::types::{
    markup_for, AnswerCallbackQuery, ApiResponse, GetUpdates, Message, SendMessage, Update, User,
};
use crate::domain::recipient::ChatId;
use crate::ports::{Messenger, OutgoingMessage, SendError};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API error {code:?}: {description}")]
    Api {
        code: Option<u16>,
        description: String,
    },

    #[error("Bot API returned no result for {0}")]
    MissingResult(&'static str),
}

impl TelegramError {
    /// Errors meaning this chat will never accept messages from the bot
    pub fn is_unreachable(&self) -> bool {
        match self {
            TelegramError::Api { code: Some(403), .. } => true,
            TelegramError::Api { code: Some(400), description } => {
                description.contains("chat not found")
            }
            _ => false,
        }
    }
}

/// Telegram client configuration
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot API base URL
    pub api_url: String,
    /// Bot token from @BotFather
    pub token: String,
    /// Long-poll timeout passed to `getUpdates`
    pub poll_timeout: Duration,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            poll_timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        // The HTTP timeout must outlast a full long poll
        let http = Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", config.api_url.trim_end_matches('/'), config.token),
            poll_timeout: config.poll_timeout,
        })
    }

    /// Identify the bot; used as a startup credential check
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates newer than `offset`
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdates {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ["message", "callback_query"],
        };
        self.call("getUpdates", &request).await
    }

    pub async fn send_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<Message, TelegramError> {
        let request = SendMessage {
            chat_id: chat.as_i64(),
            text: &message.text,
            parse_mode: "HTML",
            reply_markup: message.keyboard.map(markup_for),
        };
        self.call("sendMessage", &request).await
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<bool, TelegramError> {
        let request = AnswerCallbackQuery {
            callback_query_id: callback_id,
        };
        self.call("answerCallbackQuery", &request).await
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        // Error statuses still carry a JSON envelope, so don't bail on status.
        // URLs embed the token and must not reach the logs.
        let response: ApiResponse<T> = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.ok {
            return Err(TelegramError::Api {
                code: response.error_code,
                description: response.description.unwrap_or_default(),
            });
        }

        response.result.ok_or(TelegramError::MissingResult(method))
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> Result<(), SendError> {
        match self.send_message(chat, &message).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_unreachable() => Err(SendError::Unreachable(chat, e.to_string())),
            Err(e) => Err(SendError::Delivery(e.to_string())),
        }
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), SendError> {
        self.answer_callback_query(callback_id)
            .await
            .map(|_| ())
            .map_err(|e| SendError::Delivery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_token() {
        let config = TelegramConfig::new("123456:SECRET");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_client_creation() {
        let client = TelegramClient::new(TelegramConfig::new("123456:SECRET")).unwrap();
        assert!(!format!("{:?}", client).contains("SECRET"));
    }

    #[test]
    fn test_unreachable_classification() {
        let blocked = TelegramError::Api {
            code: Some(403),
            description: "Forbidden: bot was blocked by the user".into(),
        };
        assert!(blocked.is_unreachable());

        let missing = TelegramError::Api {
            code: Some(400),
            description: "Bad Request: chat not found".into(),
        };
        assert!(missing.is_unreachable());

        let flood = TelegramError::Api {
            code: Some(429),
            description: "Too Many Requests: retry after 5".into(),
        };
        assert!(!flood.is_unreachable());
    }
}
