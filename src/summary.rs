use crate::completion::{self, Message, TextCompletion};

const MAX_TOKENS: u32 = 200;

const INSTRUCTION: &str = "Write a short, simple, educational summary of the following text:";

/// Summarize `text`. The reply is returned trimmed and otherwise unchecked.
pub async fn summarize<C: TextCompletion>(client: &C, text: &str) -> Result<String, completion::Error> {
    let reply = client
        .complete(&[Message::system(INSTRUCTION), Message::user(text)], MAX_TOKENS)
        .await?;
    Ok(reply.trim().to_string())
}
