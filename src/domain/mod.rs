//! Domain Layer - Core logic for the rate bot
//!
//! Pure types and logic with no I/O. All external interactions happen
//! through the ports layer.
//!
//! - `recipient`: chat identity
//! - `snapshot`: normalized rate snapshot and numeric parsing
//! - `rate_limiter`: per-chat, per-query anti-spam gate
//! - `format`: fixed display templates and user-facing texts

pub mod recipient;
pub mod snapshot;
pub mod rate_limiter;
pub mod format;

pub use recipient::ChatId;
pub use snapshot::{RateSnapshot, Provider, SnapshotError, parse_decimal};
pub use rate_limiter::{RateLimiter, ResourceKey, DEFAULT_WINDOW};
pub use format::{format_cbr, format_nbk, format_other, format_daily, today_in, DEFAULT_TIMEZONE};
