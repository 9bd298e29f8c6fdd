mod alert;
mod bot;
mod config;
mod feed;
mod i18n;
mod notify;
mod poller;
mod scheduler;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::BotContext;
use crate::config::{Config, LogLevel};
use crate::feed::WaqiClient;
use crate::notify::{AlertDispatcher, TelegramNotifier};
use crate::poller::Poller;
use crate::scheduler::{tasks, Scheduler};
use crate::state::AirState;

fn init_tracing(level: LogLevel) {
    // Third-party crates stay at warn unless RUST_LOG says otherwise
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warn,aqi_bot={}", level.as_directive()).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config file path, environment variables take precedence
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let loaded = Config::load(config_path.as_deref());

    let level = loaded
        .as_ref()
        .map(|(config, _)| config.log_level)
        .unwrap_or_default();
    init_tracing(level);

    let (config, warnings) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return Err(e);
        }
    };
    for warning in &warnings {
        warn!("{}", warning);
    }

    info!("Configuration loaded successfully");
    info!("  City: {} (feed slug '{}')", config.city, config.city_slug());
    info!("  Language: {}", config.language);
    info!("  Alerts: {}", if config.chat_id.is_some() { "enabled" } else { "disabled" });
    info!("  Silent alerts: {}", config.silent);

    // Shared state and the fetch-and-evaluate pipeline
    let state = AirState::new();
    let feed = Arc::new(WaqiClient::new(&config)?);
    let notifier = Arc::new(TelegramNotifier::new(
        &config.telegram_api_url,
        &config.bot_token,
    )?);
    let dispatcher = AlertDispatcher::new(notifier, &config);
    let poller = Arc::new(Poller::new(feed, state.clone(), dispatcher));

    info!("Scheduling gathering AQI every {} minutes", config.pull_interval);
    poller.poll_once().await;

    let mut scheduler = Scheduler::new().await?;
    tasks::register_builtin_tasks(&scheduler, poller, state.clone(), config.poll_period()).await?;
    scheduler.start().await?;

    // Run the Telegram bot until Ctrl-C
    let bot = bot::build_bot(&config)?;
    let ctx = Arc::new(BotContext::new(state, &config));
    bot::run(bot, ctx).await?;

    scheduler.shutdown().await?;
    info!("Shut down cleanly");
    Ok(())
}
