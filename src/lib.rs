//! Telegram bot serving book excerpts, AI summaries and quizzes.

pub mod books;
pub mod bot;
pub mod completion;
pub mod config;
pub mod quiz;
pub mod scores;
pub mod session;
pub mod summary;
