//! In-memory port implementations that record calls and allow controlled responses

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::messenger::{Messenger, OutgoingMessage, SendError};
use super::rates::{FetchError, RateSource};
use super::registry::{RegistryError, SubscribeOutcome, SubscriberRegistry, UnsubscribeOutcome};
use crate::domain::recipient::ChatId;
use crate::domain::snapshot::{Provider, RateSnapshot};

/// Rate source returning a fixed snapshot, or failing every fetch
#[derive(Debug)]
pub struct FixedRateSource {
    provider: Provider,
    snapshot: Option<RateSnapshot>,
    calls: AtomicUsize,
}

impl FixedRateSource {
    pub fn with_snapshot(snapshot: RateSnapshot) -> Self {
        Self {
            provider: snapshot.provider(),
            snapshot: Some(snapshot),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(provider: Provider) -> Self {
        Self {
            provider,
            snapshot: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches performed so far
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for FixedRateSource {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch(&self) -> Result<RateSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot.clone().ok_or(FetchError::Status(503))
    }
}

/// Registry backed by a set in memory
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    ids: Mutex<BTreeSet<ChatId>>,
    unavailable: bool,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self {
            ids: Mutex::new(ids.into_iter().map(ChatId).collect()),
            unavailable: false,
        }
    }

    /// Registry whose every operation fails
    pub fn unavailable() -> Self {
        Self {
            ids: Mutex::default(),
            unavailable: true,
        }
    }

    pub fn snapshot(&self) -> BTreeSet<ChatId> {
        self.ids.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.unavailable {
            return Err(RegistryError::Storage("registry unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriberRegistry for InMemoryRegistry {
    async fn subscribe(&self, id: ChatId) -> Result<SubscribeOutcome, RegistryError> {
        self.check()?;
        if self.ids.lock().unwrap().insert(id) {
            Ok(SubscribeOutcome::Added)
        } else {
            Ok(SubscribeOutcome::AlreadyPresent)
        }
    }

    async fn unsubscribe(&self, id: ChatId) -> Result<UnsubscribeOutcome, RegistryError> {
        self.check()?;
        if self.ids.lock().unwrap().remove(&id) {
            Ok(UnsubscribeOutcome::Removed)
        } else {
            Ok(UnsubscribeOutcome::NotPresent)
        }
    }

    async fn list_all(&self) -> Result<Vec<ChatId>, RegistryError> {
        self.check()?;
        Ok(self.ids.lock().unwrap().iter().copied().collect())
    }
}

/// Messenger recording every send; chosen recipients always fail
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(ChatId, OutgoingMessage)>>,
    acknowledged: Mutex<Vec<String>>,
    failing: HashSet<ChatId>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to make sends to `ids` fail
    pub fn failing_for<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.failing.extend(ids.into_iter().map(ChatId));
        self
    }

    /// Successfully delivered messages
    pub fn sent(&self) -> Vec<(ChatId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat: ChatId) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == chat)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> Result<(), SendError> {
        if self.failing.contains(&chat) {
            return Err(SendError::Unreachable(chat, "Forbidden: bot was blocked by the user".into()));
        }
        self.sent.lock().unwrap().push((chat, message));
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), SendError> {
        self.acknowledged.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}
