//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - Upstream rate providers
//! - Durable subscriber storage
//! - The chat platform (inbound events, outbound sends)

pub mod rates;
pub mod registry;
pub mod messenger;
pub mod mocks;

pub use rates::{RateSource, FetchError};
pub use registry::{SubscriberRegistry, RegistryError, SubscribeOutcome, UnsubscribeOutcome};
pub use messenger::{Messenger, SendError, OutgoingMessage, Keyboard, InboundEvent};
