//! Telegram adapter using teloxide.

use std::sync::Arc;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId, Update};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use super::event::{Inbound, Reply};
use super::router::Router;
use super::Error;
use crate::completion::TextCompletion;

/// Telegram rejects messages over 4096 UTF-16 units; stay under it.
const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a reply as plain text, with its buttons as an inline keyboard.
    pub async fn send_reply(&self, chat_id: ChatId, reply: &Reply) -> Result<MessageId, teloxide::RequestError> {
        let mut request = self.bot.send_message(chat_id, clip(&reply.text, MAX_MESSAGE_CHARS));

        if !reply.buttons.is_empty() {
            request = request.reply_markup(keyboard(reply));
        }

        request.await.map(|msg| msg.id).map_err(|e| {
            warn!("Failed to send to chat {}: {e}", chat_id);
            e
        })
    }

    /// Stop the client-side loading indicator on a pressed button.
    pub async fn answer_callback(&self, query: &CallbackQuery) -> Result<(), teloxide::RequestError> {
        self.bot
            .answer_callback_query(query.id.clone())
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!("Failed to answer callback query: {e}");
                e
            })
    }
}

fn keyboard(reply: &Reply) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        reply
            .buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.data.clone())]),
    )
}

/// Truncate to `max_chars` characters, marking the cut with "...".
pub fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((end, _)) => format!("{}...", &text[..end]),
    }
}

/// Update handler tree: `/start`, other text, and button presses.
pub fn schema<C: TextCompletion + 'static>() -> UpdateHandler<Error> {
    let messages = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command::<C>))
        .branch(dptree::endpoint(handle_text::<C>));

    dptree::entry()
        .branch(messages)
        .branch(Update::filter_callback_query().endpoint(handle_callback::<C>))
}

async fn dispatch<C: TextCompletion>(
    router: &Router<C>,
    telegram: &TelegramClient,
    chat_id: ChatId,
    user_id: i64,
    event: Inbound,
) -> Result<(), Error> {
    let Some(reply) = router.handle(user_id, event.clone()).await? else {
        return Ok(());
    };
    if let Err(e) = telegram.send_reply(chat_id, &reply).await {
        router.undelivered(user_id, &event).await;
        return Err(e.into());
    }
    Ok(())
}

async fn handle_command<C: TextCompletion + 'static>(
    msg: Message,
    cmd: Command,
    router: Arc<Router<C>>,
    telegram: Arc<TelegramClient>,
) -> Result<(), Error> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    info!("👋 {:?} from {} ({})", cmd, user.first_name, user.id);

    let event = match cmd {
        Command::Start => Inbound::Start,
    };
    dispatch(&router, &telegram, msg.chat.id, user.id.0 as i64, event).await
}

async fn handle_text<C: TextCompletion + 'static>(
    msg: Message,
    router: Arc<Router<C>>,
    telegram: Arc<TelegramClient>,
) -> Result<(), Error> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    // Unknown commands are not search terms.
    if text.starts_with('/') {
        return Ok(());
    }

    let event = Inbound::Text(text.to_string());
    dispatch(&router, &telegram, msg.chat.id, user.id.0 as i64, event).await
}

async fn handle_callback<C: TextCompletion + 'static>(
    q: CallbackQuery,
    router: Arc<Router<C>>,
    telegram: Arc<TelegramClient>,
) -> Result<(), Error> {
    telegram.answer_callback(&q).await?;

    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let user_id = q.from.id.0 as i64;
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    dispatch(&router, &telegram, chat_id, user_id, Inbound::Callback(data)).await
}
