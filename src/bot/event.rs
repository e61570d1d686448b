//! Transport-neutral inbound events and outbound replies.

/// One update from a user, already stripped of Telegram details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/start` command.
    Start,
    /// Inline button press carrying its callback data.
    Callback(String),
    /// Plain text message.
    Text(String),
}

/// Menu actions. Their keywords are reserved callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Search,
    Quiz,
    Score,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Search, Action::Quiz, Action::Score];

    pub fn keyword(self) -> &'static str {
        match self {
            Action::Search => "search",
            Action::Quiz => "quiz",
            Action::Score => "score",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Search => "🔍 Search",
            Action::Quiz => "📝 Quiz",
            Action::Score => "⭐ My score",
        }
    }

    pub fn from_keyword(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.keyword() == data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self { label: label.into(), data: data.into() }
    }
}

/// Text to send back, with optional buttons laid out one per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), buttons: Vec::new() }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self { text: text.into(), buttons }
    }
}
