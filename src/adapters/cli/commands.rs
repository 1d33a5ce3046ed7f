//! CLI Commands
//!
//! Command-line definitions for the Kurs rate bot.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::domain::rate_limiter::ResourceKey;

const DEFAULT_CONFIG: &str = "config/bot.toml";

/// Kurs Bot - CBR/NBK currency rates for Telegram
#[derive(Parser, Debug)]
#[command(
    name = "kurs-bot",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Telegram bot for CBR and NBK currency rates",
    long_about = "Kurs Bot answers currency rate queries from the Central Bank of Russia and \
                  the National Bank of Kazakhstan, and sends NBK rates to subscribers every \
                  day at 09:30 Asia/Almaty."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start polling Telegram and the daily broadcast
    Run(RunCmd),

    /// Fetch and print one rate message
    Rates(RatesCmd),

    /// Send the daily broadcast right now
    Broadcast(BroadcastCmd),

    /// Show subscriber count
    Subscribers(SubscribersCmd),
}

/// Start the bot
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Do not start the daily broadcast scheduler
    #[arg(long)]
    pub no_broadcast: bool,
}

/// Which rate message to print
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatesKind {
    /// Central Bank of Russia
    Cbr,
    /// National Bank of Kazakhstan
    Nbk,
    /// Other currencies (NBK data)
    Other,
}

impl From<RatesKind> for ResourceKey {
    fn from(kind: RatesKind) -> Self {
        match kind {
            RatesKind::Cbr => ResourceKey::Cbr,
            RatesKind::Nbk => ResourceKey::Nbk,
            RatesKind::Other => ResourceKey::Other,
        }
    }
}

/// Print rates
#[derive(Parser, Debug)]
pub struct RatesCmd {
    /// Rate message to print
    #[arg(value_enum, value_name = "SOURCE")]
    pub kind: RatesKind,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Broadcast now
#[derive(Parser, Debug)]
pub struct BroadcastCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Subscriber statistics
#[derive(Parser, Debug)]
pub struct SubscribersCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// List every subscribed chat id
    #[arg(short, long)]
    pub list: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_app_parse_run() {
        let args = vec!["kurs-bot", "run", "--config", "custom.toml", "--no-broadcast"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("custom.toml"));
                assert!(cmd.no_broadcast);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_parse_rates() {
        let args = vec!["kurs-bot", "rates", "other"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Rates(cmd) => {
                assert_eq!(cmd.kind, RatesKind::Other);
                assert_eq!(ResourceKey::from(cmd.kind), ResourceKey::Other);
            }
            _ => panic!("Expected Rates command"),
        }
    }

    #[test]
    fn test_cli_app_rejects_unknown_source() {
        let args = vec!["kurs-bot", "rates", "ecb"];
        assert!(CliApp::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_app_parse_subscribers_list() {
        let args = vec!["kurs-bot", "subscribers", "--list"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Subscribers(cmd) => assert!(cmd.list),
            _ => panic!("Expected Subscribers command"),
        }
    }

    #[test]
    fn test_cli_app_parse_broadcast() {
        let args = vec!["kurs-bot", "broadcast", "-c", "prod.toml"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Broadcast(cmd) => assert_eq!(cmd.config, PathBuf::from("prod.toml")),
            _ => panic!("Expected Broadcast command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = vec!["kurs-bot", "-v", "--debug", "broadcast"];
        let app = CliApp::try_parse_from(args).unwrap();

        assert!(app.verbose);
        assert!(app.debug);
    }

    #[test]
    fn test_default_config_path() {
        let args = vec!["kurs-bot", "run"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("config/bot.toml"));
                assert!(!cmd.no_broadcast);
            }
            _ => panic!("Expected Run command"),
        }
    }
}
