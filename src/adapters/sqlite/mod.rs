//! SQLite Adapter
//!
//! Durable subscriber registry. One table, `subscribers`, with a single
//! `chat_id` primary key column.

mod registry;

pub use registry::{SqliteSubscriberRegistry, SCHEMA};
