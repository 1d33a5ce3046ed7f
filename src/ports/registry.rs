//! Subscriber registry port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recipient::ChatId;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Removed,
    NotPresent,
}

/// Durable set of subscribed recipients.
///
/// Writes are committed before the call returns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberRegistry: Send + Sync {
    async fn subscribe(&self, id: ChatId) -> Result<SubscribeOutcome, RegistryError>;

    async fn unsubscribe(&self, id: ChatId) -> Result<UnsubscribeOutcome, RegistryError>;

    /// Every subscribed id; order carries no meaning
    async fn list_all(&self) -> Result<Vec<ChatId>, RegistryError>;

    async fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.list_all().await?.len())
    }
}
