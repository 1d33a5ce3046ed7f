//! Kurs Bot - Telegram currency rate bot library
//!
//! Answers CBR and NBK rate queries on demand and broadcasts NBK rates to
//! subscribers every day at 09:30 Asia/Almaty.
//!
//! # Modules
//!
//! - `domain`: Core logic (RateSnapshot, RateLimiter, display templates)
//! - `ports`: Trait abstractions (RateSource, SubscriberRegistry, Messenger)
//! - `adapters`: External implementations (CBR, NBK, SQLite, Telegram, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Command handling, broadcast dispatcher and scheduler

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
