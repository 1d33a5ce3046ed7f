//! Kurs Bot - Telegram currency rate bot
//!
//! CBR and NBK rates on demand, NBK rates to subscribers every morning.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use kurs_bot::adapters::cli::{CliApp, Command, RatesCmd, RunCmd, SubscribersCmd};
use kurs_bot::adapters::{CbrClient, NbkClient, SqliteSubscriberRegistry, TelegramClient, TelegramConfig};
use kurs_bot::application::{
    render_rates, run_polling, BotService, BroadcastDispatcher, BroadcastScheduler, DailySchedule,
};
use kurs_bot::config::{load_config_or_default, Config};
use kurs_bot::domain::{today_in, RateLimiter};
use kurs_bot::ports::{Messenger, SubscriberRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (the bot token goes here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    match app.command {
        Command::Run(cmd) => {
            let config = load(&cmd.config, app.verbose, app.debug)?;
            run_command(cmd, config).await
        }
        Command::Rates(cmd) => {
            let config = load(&cmd.config, app.verbose, app.debug)?;
            rates_command(cmd, config).await
        }
        Command::Broadcast(cmd) => {
            let config = load(&cmd.config, app.verbose, app.debug)?;
            broadcast_command(config).await
        }
        Command::Subscribers(cmd) => {
            let config = load(&cmd.config, app.verbose, app.debug)?;
            subscribers_command(cmd, config).await
        }
    }
}

fn load(path: &std::path::Path, verbose: bool, debug: bool) -> Result<Config> {
    let config = load_config_or_default(path).context("Failed to load configuration")?;
    init_logging(&config, verbose, debug)?;
    Ok(config)
}

fn init_logging(config: &Config, verbose: bool, debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_sources(config: &Config) -> Result<(Arc<CbrClient>, Arc<NbkClient>)> {
    let tz = config.broadcast.parsed_timezone()?;
    let timeout = config.sources.timeout();

    let cbr = CbrClient::with_url(config.sources.cbr_url.clone(), timeout)
        .context("Failed to create CBR client")?;
    let nbk = NbkClient::with_url(config.sources.nbk_url.clone(), timeout, tz)
        .context("Failed to create NBK client")?;
    Ok((Arc::new(cbr), Arc::new(nbk)))
}

fn open_registry(config: &Config) -> Result<Arc<SqliteSubscriberRegistry>> {
    let path = config.storage.get_database_path();
    let registry = SqliteSubscriberRegistry::open(&path)
        .with_context(|| format!("Failed to open subscriber database {}", path.display()))?;
    Ok(Arc::new(registry))
}

async fn connect_telegram(config: &Config) -> Result<TelegramClient> {
    let token = config
        .telegram
        .get_bot_token()
        .context("Bot token missing: set TELEGRAM_BOT_TOKEN or telegram.bot_token")?;

    let client = TelegramClient::new(TelegramConfig {
        api_url: config.telegram.api_url.clone(),
        token,
        poll_timeout: config.telegram.poll_timeout(),
    })
    .context("Failed to create Telegram client")?;

    let me = client.get_me().await.context("Telegram rejected the bot token")?;
    tracing::info!(
        "Connected to Telegram as @{}",
        me.username.as_deref().unwrap_or("<unnamed>")
    );
    Ok(client)
}

fn build_dispatcher(
    config: &Config,
    registry: Arc<SqliteSubscriberRegistry>,
    nbk: Arc<NbkClient>,
    messenger: Arc<dyn Messenger>,
) -> Result<BroadcastDispatcher> {
    Ok(BroadcastDispatcher::new(registry, nbk, messenger)
        .with_timezone(config.broadcast.parsed_timezone()?)
        .with_send_delay(config.broadcast.send_delay()))
}

async fn run_command(cmd: RunCmd, config: Config) -> Result<()> {
    tracing::info!("Starting Kurs bot...");

    let registry = open_registry(&config)?;
    let (cbr, nbk) = build_sources(&config)?;
    let telegram = connect_telegram(&config).await?;
    let messenger: Arc<dyn Messenger> = Arc::new(telegram.clone());
    let tz = config.broadcast.parsed_timezone()?;

    let limiter = Arc::new(RateLimiter::new(config.limits.window()));
    let service = BotService::new(
        cbr,
        nbk.clone(),
        registry.clone(),
        messenger.clone(),
        limiter,
    )
    .with_timezone(tz);

    let dispatcher = build_dispatcher(&config, registry, nbk, messenger)?;
    let schedule = DailySchedule::new(config.broadcast.parsed_time()?, tz);
    let scheduler = BroadcastScheduler::new(schedule, Arc::new(dispatcher));

    if cmd.no_broadcast {
        tracing::warn!("Daily broadcast disabled");
    } else {
        tracing::info!(
            "Daily broadcast at {} {}",
            schedule.at().format("%H:%M"),
            schedule.timezone()
        );
    }

    tokio::select! {
        _ = run_polling(telegram, Arc::new(service)) => {}
        _ = scheduler.run(), if !cmd.no_broadcast => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Kurs bot stopped");
    Ok(())
}

async fn rates_command(cmd: RatesCmd, config: Config) -> Result<()> {
    let (cbr, nbk) = build_sources(&config)?;
    let today = today_in(config.broadcast.parsed_timezone()?, Utc::now());

    let text = render_rates(cmd.kind.into(), cbr.as_ref(), nbk.as_ref(), today)
        .await
        .context("Failed to get rates")?;

    println!("{}", text);
    Ok(())
}

async fn broadcast_command(config: Config) -> Result<()> {
    let registry = open_registry(&config)?;
    let (_, nbk) = build_sources(&config)?;
    let messenger: Arc<dyn Messenger> = Arc::new(connect_telegram(&config).await?);

    let dispatcher = build_dispatcher(&config, registry, nbk, messenger)?;
    let schedule = DailySchedule::new(
        config.broadcast.parsed_time()?,
        config.broadcast.parsed_timezone()?,
    );
    let scheduler = BroadcastScheduler::new(schedule, Arc::new(dispatcher));

    let handle = scheduler
        .trigger()
        .context("A broadcast is already in flight")?;
    let report = handle
        .await
        .context("Broadcast task crashed")?
        .context("Broadcast aborted")?;

    println!(
        "Delivered {}/{} ({} failed)",
        report.delivered,
        report.recipients,
        report.failed()
    );
    for (chat, error) in &report.failures {
        println!("  {}: {}", chat, error);
    }
    Ok(())
}

async fn subscribers_command(cmd: SubscribersCmd, config: Config) -> Result<()> {
    let registry = open_registry(&config)?;

    if cmd.list {
        let mut ids = registry.list_all().await?;
        ids.sort();
        for id in &ids {
            println!("{}", id);
        }
    }

    println!("Subscribers: {}", registry.count().await?);
    Ok(())
}
