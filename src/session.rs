//! Per-user conversation state.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// How the next free-text message from a user is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    AwaitingSearch,
    AwaitingQuizAnswer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    pub mode: Mode,
    /// Correct answer of the quiz most recently shown to the user.
    pub pending_answer: Option<String>,
}

/// Sessions keyed by Telegram user id, created on first use.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, UserSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: i64) -> UserSession {
        self.sessions.lock().await.get(&user_id).cloned().unwrap_or_default()
    }

    pub async fn mode(&self, user_id: i64) -> Mode {
        self.get(user_id).await.mode
    }

    pub async fn set_mode(&self, user_id: i64, mode: Mode) {
        self.sessions.lock().await.entry(user_id).or_default().mode = mode;
    }

    /// Record a newly issued quiz, replacing any earlier pending answer.
    pub async fn begin_quiz(&self, user_id: i64, answer: String) {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(user_id).or_default();
        session.mode = Mode::AwaitingQuizAnswer;
        session.pending_answer = Some(answer);
    }

    /// Take the pending answer, leaving none behind.
    ///
    /// A user still waiting on the quiz goes back to idle; a search prompt
    /// opened after the quiz is left alone.
    pub async fn take_pending_answer(&self, user_id: i64) -> Option<String> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&user_id)?;
        let answer = session.pending_answer.take()?;
        if session.mode == Mode::AwaitingQuizAnswer {
            session.mode = Mode::Idle;
        }
        Some(answer)
    }
}
