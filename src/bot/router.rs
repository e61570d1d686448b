//! Routes inbound events through the conversation state machine.

use std::sync::Arc;

use tracing::{debug, info};

use super::Error;
use super::event::{Action, Button, Inbound, Reply};
use crate::books::{Library, SearchHit};
use crate::completion::TextCompletion;
use crate::quiz;
use crate::scores::ScoreLedger;
use crate::session::{Mode, SessionStore};
use crate::summary;

pub const MENU_TEXT: &str = "Hi 👋 Pick one of the options below:";
pub const SEARCH_PROMPT: &str = "Send me the phrase you are looking for:";
pub const NOT_FOUND_TEXT: &str = "Nothing found ❌";
pub const CORRECT_TEXT: &str = "✅ Correct! +1 point";

/// Owns the per-user sessions and holds the shared library, completion
/// client and score ledger.
pub struct Router<C> {
    library: Arc<Library>,
    completion: C,
    scores: Arc<ScoreLedger>,
    sessions: SessionStore,
}

impl<C: TextCompletion> Router<C> {
    pub fn new(library: Arc<Library>, completion: C, scores: Arc<ScoreLedger>) -> Self {
        Self {
            library,
            completion,
            scores,
            sessions: SessionStore::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn scores(&self) -> &ScoreLedger {
        &self.scores
    }

    /// Handle one event from `user_id`. `Ok(None)` means nothing is sent back.
    pub async fn handle(&self, user_id: i64, event: Inbound) -> Result<Option<Reply>, Error> {
        match event {
            Inbound::Start => Ok(Some(menu())),
            Inbound::Callback(data) => match Action::from_keyword(&data) {
                Some(action) => self.handle_action(user_id, action).await.map(Some),
                None => Ok(self.handle_answer(user_id, &data).await),
            },
            Inbound::Text(text) => match self.sessions.mode(user_id).await {
                Mode::AwaitingSearch => self.handle_search(user_id, &text).await.map(Some),
                mode => {
                    debug!(user_id, ?mode, "Ignoring free text outside search mode");
                    Ok(None)
                }
            },
        }
    }

    /// Forget the quiz issued by `event` when its reply never reached the user.
    pub async fn undelivered(&self, user_id: i64, event: &Inbound) {
        if let Inbound::Callback(data) = event
            && Action::from_keyword(data) == Some(Action::Quiz)
            && let Some(answer) = self.sessions.take_pending_answer(user_id).await
        {
            info!(user_id, answer = %answer, "Quiz was not delivered; dropping it");
        }
    }

    async fn handle_action(&self, user_id: i64, action: Action) -> Result<Reply, Error> {
        match action {
            Action::Search => {
                self.sessions.set_mode(user_id, Mode::AwaitingSearch).await;
                Ok(Reply::text(SEARCH_PROMPT))
            }
            Action::Quiz => {
                let excerpt = self.library.excerpt();
                let quiz = quiz::generate(&self.completion, &excerpt).await?;
                info!(user_id, question = %quiz.question, "📝 Quiz issued");

                self.sessions.begin_quiz(user_id, quiz.answer.clone()).await;
                let buttons = quiz
                    .options
                    .iter()
                    .map(|o| Button::new(o.as_str(), o.as_str()))
                    .collect();
                Ok(Reply::with_buttons(format!("❓ {}", quiz.question), buttons))
            }
            Action::Score => {
                let score = self.scores.get(user_id).await;
                Ok(Reply::text(format!("⭐ Your current score: {score}")))
            }
        }
    }

    async fn handle_search(&self, user_id: i64, text: &str) -> Result<Reply, Error> {
        // Leave search mode before anything can fail.
        self.sessions.set_mode(user_id, Mode::Idle).await;

        let query = text.trim();
        let hits = self.library.search(query);
        info!(user_id, query, hits = hits.len(), "🔍 Search");

        if hits.is_empty() {
            return Ok(Reply::text(NOT_FOUND_TEXT));
        }

        let joined = format_hits(&hits);
        let summary = summary::summarize(&self.completion, &joined).await?;
        Ok(Reply::text(format!("🔍 Results:\n{joined}\n\n📌 Summary:\n{summary}")))
    }

    async fn handle_answer(&self, user_id: i64, selected: &str) -> Option<Reply> {
        let Some(correct) = self.sessions.take_pending_answer(user_id).await else {
            debug!(user_id, selected, "No pending quiz; dropping selection");
            return None;
        };

        if selected == correct {
            let score = self.scores.increment(user_id).await;
            info!(user_id, score, "✅ Correct answer");
            Some(Reply::text(CORRECT_TEXT))
        } else {
            info!(user_id, selected, correct = %correct, "❌ Wrong answer");
            Some(Reply::text(format!("❌ Wrong! The correct answer is: {correct}")))
        }
    }
}

pub fn menu() -> Reply {
    let buttons = Action::ALL
        .into_iter()
        .map(|a| Button::new(a.label(), a.keyword()))
        .collect();
    Reply::with_buttons(MENU_TEXT, buttons)
}

fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("📖 {}: {}", h.document, h.line))
        .collect::<Vec<_>>()
        .join("\n")
}
