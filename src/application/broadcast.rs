//! Broadcast Dispatcher
//!
//! One daily run: load subscribers, fetch NBK rates once, format once, then
//! send to every subscriber. A failed send is logged and recorded in the
//! report; it never stops the loop. A failed load or fetch aborts the whole
//! run before anyone is messaged.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use thiserror::Error;

use crate::domain::format::{format_daily, today_in, DEFAULT_TIMEZONE};
use crate::domain::recipient::ChatId;
use crate::ports::{
    FetchError, Messenger, OutgoingMessage, RateSource, RegistryError, SendError,
    SubscriberRegistry,
};

/// Minimum pause between two consecutive sends
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Failed to load subscribers: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to fetch rates: {0}")]
    Fetch(#[from] FetchError),
}

/// Outcome of a completed run
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Subscribers loaded at the start of the run
    pub recipients: usize,
    /// Successful sends
    pub delivered: usize,
    /// Recipients whose send failed, with the reason
    pub failures: Vec<(ChatId, SendError)>,
}

impl BroadcastReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients == 0
    }
}

pub struct BroadcastDispatcher {
    registry: Arc<dyn SubscriberRegistry>,
    source: Arc<dyn RateSource>,
    messenger: Arc<dyn Messenger>,
    tz: Tz,
    send_delay: Duration,
}

impl BroadcastDispatcher {
    pub fn new(
        registry: Arc<dyn SubscriberRegistry>,
        source: Arc<dyn RateSource>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            registry,
            source,
            messenger,
            tz: DEFAULT_TIMEZONE,
            send_delay: DEFAULT_SEND_DELAY,
        }
    }

    /// Timezone the message date is rendered in
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// Execute one broadcast run
    pub async fn run(&self) -> Result<BroadcastReport, BroadcastError> {
        // 1. Load
        let subscribers = self.registry.list_all().await.map_err(|e| {
            tracing::error!("Daily broadcast aborted, cannot load subscribers: {}", e);
            e
        })?;

        if subscribers.is_empty() {
            return Ok(BroadcastReport::default());
        }

        // 2. Fetch once for everybody
        let snapshot = self.source.fetch().await.map_err(|e| {
            tracing::error!(
                "Daily broadcast aborted, {} rates unavailable: {}",
                self.source.provider(),
                e
            );
            e
        })?;

        // 3. Format once
        let text = format_daily(&snapshot, today_in(self.tz, Utc::now())).map_err(|e| {
            tracing::error!("Daily broadcast aborted, cannot format rates: {}", e);
            FetchError::from(e)
        })?;

        tracing::info!("Broadcasting daily rates to {} subscribers", subscribers.len());

        // 4. Fan out
        let mut report = BroadcastReport {
            recipients: subscribers.len(),
            ..Default::default()
        };

        for (i, chat) in subscribers.into_iter().enumerate() {
            if i > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }

            match self.messenger.send(chat, OutgoingMessage::text(text.as_str())).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::error!(chat_id = %chat, "Failed to deliver daily rates: {}", e);
                    report.failures.push((chat, e));
                }
            }
        }

        tracing::info!(
            "Daily broadcast finished: {}/{} delivered, {} failed",
            report.delivered,
            report.recipients,
            report.failed()
        );
        Ok(report)
    }
}
