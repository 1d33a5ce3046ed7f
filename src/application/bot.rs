//! Interactive command handling
//!
//! Routes inbound chat events to the rate queries and the subscription
//! actions. Rate queries pass through the per-chat rate limiter first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::adapters::telegram::TelegramClient;
use crate::domain::format::{self, texts, today_in, DEFAULT_TIMEZONE};
use crate::domain::rate_limiter::{RateLimiter, ResourceKey};
use crate::domain::recipient::ChatId;
use crate::ports::messenger::{CALLBACK_SUBSCRIBE, CALLBACK_UNSUBSCRIBE};
use crate::ports::{
    FetchError, InboundEvent, Keyboard, Messenger, OutgoingMessage, RateSource, SendError,
    SubscribeOutcome, SubscriberRegistry, UnsubscribeOutcome,
};

/// Pause before polling again after a failed getUpdates
pub const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How often stale rate-limit entries are dropped
pub const LIMITER_PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// What an inbound event asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Rates(ResourceKey),
    SubscriptionMenu,
    Subscribe,
    Unsubscribe,
}

impl Action {
    /// Map message text (command or reply-keyboard button) to an action
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        // "/start@SomeBot" in group chats
        let command = text.split('@').next().unwrap_or(text);
        match command {
            "/start" => Some(Action::Start),
            texts::BUTTON_CBR => Some(Action::Rates(ResourceKey::Cbr)),
            texts::BUTTON_NBK => Some(Action::Rates(ResourceKey::Nbk)),
            texts::BUTTON_OTHER => Some(Action::Rates(ResourceKey::Other)),
            texts::BUTTON_SUBSCRIPTION => Some(Action::SubscriptionMenu),
            _ => None,
        }
    }

    /// Map inline callback data to an action
    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            CALLBACK_SUBSCRIBE => Some(Action::Subscribe),
            CALLBACK_UNSUBSCRIBE => Some(Action::Unsubscribe),
            _ => None,
        }
    }
}

pub struct BotService {
    cbr: Arc<dyn RateSource>,
    nbk: Arc<dyn RateSource>,
    registry: Arc<dyn SubscriberRegistry>,
    messenger: Arc<dyn Messenger>,
    limiter: Arc<RateLimiter>,
    tz: Tz,
}

impl BotService {
    pub fn new(
        cbr: Arc<dyn RateSource>,
        nbk: Arc<dyn RateSource>,
        registry: Arc<dyn SubscriberRegistry>,
        messenger: Arc<dyn Messenger>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            cbr,
            nbk,
            registry,
            messenger,
            limiter,
            tz: DEFAULT_TIMEZONE,
        }
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Handle one inbound event; returns the reply's delivery result
    pub async fn handle(&self, event: InboundEvent) -> Result<(), SendError> {
        match event {
            InboundEvent::Message { chat, text } => match Action::from_text(&text) {
                Some(action) => self.dispatch(chat, action).await,
                None => Ok(()),
            },
            InboundEvent::Callback {
                chat,
                callback_id,
                data,
            } => {
                if let Err(e) = self.messenger.acknowledge(&callback_id).await {
                    tracing::warn!(chat_id = %chat, "Failed to answer callback: {}", e);
                }
                match Action::from_callback(&data) {
                    Some(action) => self.dispatch(chat, action).await,
                    None => {
                        tracing::debug!(chat_id = %chat, "Ignoring unknown callback '{}'", data);
                        Ok(())
                    }
                }
            }
        }
    }

    async fn dispatch(&self, chat: ChatId, action: Action) -> Result<(), SendError> {
        let reply = match action {
            Action::Start => OutgoingMessage::text(texts::MENU_PROMPT).with_keyboard(Keyboard::MainMenu),
            Action::Rates(resource) => self.rates_reply(chat, resource).await,
            Action::SubscriptionMenu => {
                OutgoingMessage::text(texts::SUBSCRIPTION_MENU).with_keyboard(Keyboard::SubscriptionMenu)
            }
            Action::Subscribe => self.subscribe_reply(chat).await,
            Action::Unsubscribe => self.unsubscribe_reply(chat).await,
        };
        self.messenger.send(chat, reply).await
    }

    async fn rates_reply(&self, chat: ChatId, resource: ResourceKey) -> OutgoingMessage {
        if !self.limiter.allow(chat, resource, Instant::now()) {
            tracing::debug!(chat_id = %chat, "Rate limited on {}", resource);
            return OutgoingMessage::text(texts::RATE_LIMITED);
        }

        let today = today_in(self.tz, Utc::now());
        match render_rates(resource, self.cbr.as_ref(), self.nbk.as_ref(), today).await {
            Ok(text) => OutgoingMessage::text(text),
            Err(e) => {
                tracing::error!(chat_id = %chat, "Failed to get {} rates: {}", resource, e);
                OutgoingMessage::text(texts::FETCH_FAILED)
            }
        }
    }


    async fn subscribe_reply(&self, chat: ChatId) -> OutgoingMessage {
        let text = match self.registry.subscribe(chat).await {
            Ok(SubscribeOutcome::Added) => texts::SUBSCRIBED,
            Ok(SubscribeOutcome::AlreadyPresent) => texts::ALREADY_SUBSCRIBED,
            Err(e) => {
                tracing::error!(chat_id = %chat, "Subscribe failed: {}", e);
                texts::GENERIC_FAILURE
            }
        };
        OutgoingMessage::text(text)
    }

    async fn unsubscribe_reply(&self, chat: ChatId) -> OutgoingMessage {
        let text = match self.registry.unsubscribe(chat).await {
            Ok(UnsubscribeOutcome::Removed) => texts::UNSUBSCRIBED,
            Ok(UnsubscribeOutcome::NotPresent) => texts::NOT_SUBSCRIBED,
            Err(e) => {
                tracing::error!(chat_id = %chat, "Unsubscribe failed: {}", e);
                texts::GENERIC_FAILURE
            }
        };
        OutgoingMessage::text(text)
    }
}

/// Fetch and format the message for one query class
pub async fn render_rates(
    resource: ResourceKey,
    cbr: &dyn RateSource,
    nbk: &dyn RateSource,
    date: NaiveDate,
) -> Result<String, FetchError> {
    let text = match resource {
        ResourceKey::Cbr => format::format_cbr(&cbr.fetch().await?, date)?,
        ResourceKey::Nbk => format::format_nbk(&nbk.fetch().await?, date)?,
        ResourceKey::Other => format::format_other(&nbk.fetch().await?, date),
    };
    Ok(text)
}

/// Long-poll Telegram and handle each event on its own task. Runs until dropped.
pub async fn run_polling(client: TelegramClient, service: Arc<BotService>) {
    let mut offset: Option<i64> = None;
    let mut last_purge = Instant::now();

    tracing::info!("Polling Telegram for updates");
    loop {
        match client.get_updates(offset).await {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let Some(event) = update.into_event() else {
                        continue;
                    };
                    let service = Arc::clone(&service);
                    tokio::spawn(async move {
                        let chat = event.chat();
                        if let Err(e) = service.handle(event).await {
                            tracing::warn!(chat_id = %chat, "Failed to reply: {}", e);
                        }
                    });
                }
            }
            Err(e) => {
                tracing::error!("getUpdates failed: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }

        if last_purge.elapsed() >= LIMITER_PURGE_INTERVAL {
            let removed = service.limiter().purge_expired(Instant::now());
            tracing::debug!("Purged {} stale rate-limit entries", removed);
            last_purge = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_text() {
        assert_eq!(Action::from_text("/start"), Some(Action::Start));
        assert_eq!(Action::from_text("/start@KursBot"), Some(Action::Start));
        assert_eq!(Action::from_text("📊 Курс ЦБ РФ"), Some(Action::Rates(ResourceKey::Cbr)));
        assert_eq!(Action::from_text("📊 Курс НБ РК"), Some(Action::Rates(ResourceKey::Nbk)));
        assert_eq!(
            Action::from_text("🌍 Остальные валюты"),
            Some(Action::Rates(ResourceKey::Other))
        );
        assert_eq!(
            Action::from_text("🔔 Подписка на уведомления"),
            Some(Action::SubscriptionMenu)
        );
        assert_eq!(Action::from_text("hello"), None);
    }

    #[test]
    fn test_action_from_callback() {
        assert_eq!(Action::from_callback("subscribe"), Some(Action::Subscribe));
        assert_eq!(Action::from_callback("unsubscribe"), Some(Action::Unsubscribe));
        assert_eq!(Action::from_callback("other"), None);
    }
}
