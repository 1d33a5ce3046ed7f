//! CLI Adapter
//!
//! Command-line interface for the Kurs rate bot.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, RunCmd, RatesCmd, RatesKind, BroadcastCmd, SubscribersCmd};

