//! Bot front end: event routing plus the Telegram adapter around it.

pub mod event;
pub mod router;
pub mod telegram;
pub mod webhook;


pub use event::{Action, Button, Inbound, Reply};
pub use router::Router;
pub use telegram::{schema, Command, TelegramClient};
pub use webhook::ListenError;

use crate::completion;

/// Failure while handling a single update. Only that update is lost.
#[derive(Debug)]
pub enum Error {
    Completion(completion::Error),
    Telegram(teloxide::RequestError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Completion(e) => write!(f, "completion failed: {e}"),
            Error::Telegram(e) => write!(f, "telegram request failed: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Completion(e) => Some(e),
            Error::Telegram(e) => Some(e),
        }
    }
}

impl From<completion::Error> for Error {
    fn from(e: completion::Error) -> Self {
        Error::Completion(e)
    }
}

impl From<teloxide::RequestError> for Error {
    fn from(e: teloxide::RequestError) -> Self {
        Error::Telegram(e)
    }
}
