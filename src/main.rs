use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use bookbot::books::Library;
use bookbot::bot::{schema, webhook, Command, Router, TelegramClient};
use bookbot::completion::OpenAiClient;
use bookbot::config::Config;
use bookbot::scores::ScoreLedger;

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&config.data_dir);

    info!("🚀 Starting bookbot...");
    if let Some(ref path) = config_path {
        info!("Loaded config from {}", path.display());
    }
    info!("Model: {} via {}", config.model, config.openai_base_url);

    let library = match Library::load_all(&config.books_dir) {
        Ok(lib) => Arc::new(lib),
        Err(e) => {
            error!("Failed to load books from {}: {e}", config.books_dir.display());
            std::process::exit(1);
        }
    };

    let completion = match OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.model.clone(),
        config.request_timeout,
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build completion client: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let router = Arc::new(Router::new(library, completion, Arc::new(ScoreLedger::new())));
    let telegram = Arc::new(TelegramClient::new(bot.clone()));

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema::<OpenAiClient>())
        .dependencies(dptree::deps![router, telegram])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("Error while handling update"))
        .enable_ctrlc_handler()
        .build();

    match config.webhook_url.clone() {
        Some(url) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            info!("Listening for webhook on {addr} ({url})");
            let listener = match webhook::listen(bot, webhooks::Options::new(addr, url)).await {
                Ok(l) => l,
                Err(e) => {
                    error!("Failed to set up webhook: {e}");
                    std::process::exit(1);
                }
            };
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("Error from the webhook listener"),
                )
                .await;
        }
        None => {
            info!("No webhook_url configured, using long polling");
            dispatcher.dispatch().await;
        }
    }
}

/// Log to stdout and to `{data_dir}/logs/bookbot.log`.
fn init_logging(data_dir: &Path) -> Option<WorkerGuard> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        );

    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("bookbot.log"));

    match log_file {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_filter(
                            tracing_subscriber::EnvFilter::from_default_env()
                                .add_directive(tracing::Level::INFO.into()),
                        ),
                )
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry().with(stdout_layer).init();
            warn!("Could not open log file in {}: {e}; logging to stdout only", log_dir.display());
            None
        }
    }
}
