use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::dispatching::{HandlerExt, UpdateFilterExt};
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_TELEGRAM_API_URL};
use crate::feed::Reading;
use crate::i18n::{self, Language, MessageKind};
use crate::state::AirState;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start interacting with the bot
    Start,
    /// How the air quality index works
    Help,
    /// Current air quality index
    Aqi,
}

/// Read-only context shared by all handlers.
pub struct BotContext {
    pub state: AirState,
    pub language: Language,
    pub city: String,
}

impl BotContext {
    pub fn new(state: AirState, config: &Config) -> Self {
        Self {
            state,
            language: config.language,
            city: config.city.clone(),
        }
    }
}

/// Build the Telegram client, honouring a custom Bot API server.
pub fn build_bot(config: &Config) -> Result<Bot> {
    let bot = Bot::new(&config.bot_token);
    if config.telegram_api_url == DEFAULT_TELEGRAM_API_URL {
        return Ok(bot);
    }
    let url = reqwest::Url::parse(&config.telegram_api_url)
        .with_context(|| format!("Invalid TELEGRAM_API_URL: {}", config.telegram_api_url))?;
    Ok(bot.set_api_url(url))
}

/// Run the inbound message loop until Ctrl-C.
pub async fn run(bot: Bot, ctx: Arc<BotContext>) -> Result<()> {
    info!("Starting Telegram bot...");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                .endpoint(handle_text),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("bot"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    info!("Command {:?} from chat {}", cmd, msg.chat.id);

    let text = match cmd {
        Command::Start => welcome_text(ctx.language, &ctx.city, &mention(&msg)),
        Command::Help => {
            let reading = ctx.state.snapshot().await;
            help_text(ctx.language, reading.as_deref())
        }
        Command::Aqi => {
            let reading = ctx.state.snapshot().await;
            aqi_text(ctx.language, &ctx.city, reading.as_deref())
        }
    };

    reply(&bot, &msg, text).await;
    Ok(())
}

/// Free text is answered like /aqi.
async fn handle_text(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> ResponseResult<()> {
    info!("Text message from chat {}", msg.chat.id);

    let reading = ctx.state.snapshot().await;
    reply(&bot, &msg, aqi_text(ctx.language, &ctx.city, reading.as_deref())).await;
    Ok(())
}

/// Fire-and-forget HTML reply; failures are only logged.
async fn reply(bot: &Bot, msg: &Message, text: String) {
    if let Err(e) = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await
    {
        error!("Error while sending message: {}", e);
    }
}

/// HTML link to the sender, falling back to the chat name.
fn mention(msg: &Message) -> String {
    match msg.from.as_ref() {
        Some(user) => format!(
            "<a href=\"{}\">{}</a>",
            user.url(),
            html::escape(&user.full_name())
        ),
        None => html::escape(msg.chat.title().or(msg.chat.first_name()).unwrap_or("")),
    }
}

pub fn welcome_text(language: Language, city: &str, user_mention: &str) -> String {
    let city = html::escape(city);
    i18n::render(
        language,
        MessageKind::Welcome,
        &[("user", user_mention), ("city", city.as_str())],
    )
}

pub fn help_text(language: Language, reading: Option<&Reading>) -> String {
    let intro = match reading {
        Some(reading) => {
            let location = html::escape(&reading.location_name);
            let location_url = html::escape(&reading.location_url);
            i18n::render(
                language,
                MessageKind::HelpIntro,
                &[
                    ("location", location.as_str()),
                    ("location_url", location_url.as_str()),
                ],
            )
        }
        None => i18n::render(language, MessageKind::HelpIntroNoData, &[]),
    };
    intro + &i18n::render(language, MessageKind::HelpBody, &[])
}

pub fn aqi_text(language: Language, city: &str, reading: Option<&Reading>) -> String {
    match reading {
        Some(reading) => {
            let city = html::escape(city);
            let pm10 = reading.pm10.to_string();
            let pm25 = reading.pm25.to_string();
            i18n::render(
                language,
                MessageKind::CurrentAqi,
                &[
                    ("city", city.as_str()),
                    ("pm10", pm10.as_str()),
                    ("pm25", pm25.as_str()),
                ],
            )
        }
        None => i18n::render(language, MessageKind::NotAvailable, &[]),
    }
}
