//! Rate source port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::snapshot::{Provider, RateSnapshot, SnapshotError};

/// Upstream fetch failure. Never retried inside the core.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Failed to parse {provider} response: {reason}")]
    Parse { provider: Provider, reason: String },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl FetchError {
    pub fn parse(provider: Provider, reason: impl ToString) -> Self {
        FetchError::Parse {
            provider,
            reason: reason.to_string(),
        }
    }
}

/// A single upstream provider of currency rates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    fn provider(&self) -> Provider;

    /// Fetch a fresh snapshot; one network call, no retries
    async fn fetch(&self) -> Result<RateSnapshot, FetchError>;
}
