//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Rates: CBR (JSON) and NBK (XML) HTTP clients
//! - SQLite: durable subscriber registry
//! - Telegram: Bot API client and long polling
//! - CLI: Command-line interface definitions

pub mod rates;
pub mod sqlite;
pub mod telegram;
pub mod cli;

pub use rates::{CbrClient, NbkClient};
pub use sqlite::SqliteSubscriberRegistry;
pub use telegram::{TelegramClient, TelegramConfig};
pub use cli::CliApp;
