//! Multiple-choice quiz generation.
//!
//! The completion service is asked for a JSON object but is not trusted to
//! produce one. Whatever comes back is normalized into a [`QuizRecord`] with
//! exactly four options and an answer that is one of them.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::completion::{self, Message, TextCompletion};

pub const OPTION_COUNT: usize = 4;
pub const FILLER_OPTIONS: [&str; OPTION_COUNT] = ["A", "B", "C", "D"];

const MAX_TOKENS: u32 = 300;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRecord {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// The reply shape we ask the service for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawQuiz {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

fn prompt(excerpt: &str) -> String {
    format!(
        r#"Write one four-option multiple-choice question about the text below.
The output must be valid JSON containing only the fields question, options and answer.
Format:
{{
  "question": "question text",
  "options": ["option A", "option B", "option C", "option D"],
  "answer": "the correct option, copied exactly"
}}

Text:
{excerpt}"#
    )
}

/// Ask the completion service for a quiz about `excerpt`.
///
/// Only transport failures are errors; any reply text yields a usable record.
pub async fn generate<C: TextCompletion>(client: &C, excerpt: &str) -> Result<QuizRecord, completion::Error> {
    let reply = client.complete(&[Message::user(prompt(excerpt))], MAX_TOKENS).await?;
    Ok(normalize(&reply))
}

/// Turn a raw service reply into a well-formed quiz.
pub fn normalize(reply: &str) -> QuizRecord {
    let text = strip_code_fences(reply);
    match parse_reply(&text) {
        Ok(raw) => from_raw(raw),
        Err(e) => {
            warn!("Quiz reply was not valid JSON ({e}); using fallback quiz");
            fallback(&text)
        }
    }
}

/// Keep only the contents of the first fenced block, if there is one.
pub fn strip_code_fences(reply: &str) -> String {
    match CODE_FENCE.captures(reply).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => reply.trim().to_string(),
    }
}

/// Parse the structured reply. Tolerates prose around a single JSON object.
pub fn parse_reply(text: &str) -> Result<RawQuiz, serde_json::Error> {
    match serde_json::from_str(text) {
        Ok(raw) => Ok(raw),
        Err(e) => {
            let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
                return Err(e);
            };
            if start >= end || (start == 0 && end == text.len() - 1) {
                return Err(e);
            }
            debug!("Retrying quiz parse on embedded object");
            serde_json::from_str(&text[start..=end]).map_err(|_| e)
        }
    }
}

fn from_raw(raw: RawQuiz) -> QuizRecord {
    let RawQuiz { question, mut options, answer } = raw;
    let answer = answer.filter(|a| !a.trim().is_empty());
    // Telegram rejects buttons with blank text.
    options.retain(|o| !o.trim().is_empty());

    if options.len() > OPTION_COUNT {
        let kept_answer = answer
            .as_ref()
            .and_then(|a| options.iter().position(|o| o == a))
            .filter(|&i| i >= OPTION_COUNT);
        if let Some(i) = kept_answer {
            options.swap(OPTION_COUNT - 1, i);
        }
        options.truncate(OPTION_COUNT);
    }

    for filler in FILLER_OPTIONS {
        if options.len() >= OPTION_COUNT {
            break;
        }
        if !options.iter().any(|o| o == filler) {
            options.push(filler.to_string());
        }
    }

    let answer = match answer {
        Some(a) => resolve_answer(&a, &options),
        None => options[0].clone(),
    };

    QuizRecord { question, options, answer }
}

/// Map the service's answer onto one of the options.
fn resolve_answer(answer: &str, options: &[String]) -> String {
    if options.iter().any(|o| o == answer) {
        return answer.to_string();
    }

    let wanted = answer.trim().to_lowercase();
    if let Some(o) = options.iter().find(|o| o.trim().to_lowercase() == wanted) {
        return o.clone();
    }

    let letter = wanted.trim_end_matches([')', '.', ':']);
    if let Some(i) = FILLER_OPTIONS.iter().position(|f| f.eq_ignore_ascii_case(letter)) {
        return options[i].clone();
    }

    debug!(answer, "Quiz answer not among options; defaulting to first option");
    options[0].clone()
}

fn fallback(text: &str) -> QuizRecord {
    QuizRecord {
        question: text.lines().next().unwrap_or("").to_string(),
        options: FILLER_OPTIONS.iter().map(|s| s.to_string()).collect(),
        answer: FILLER_OPTIONS[0].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(quiz: &QuizRecord) {
        assert_eq!(quiz.options.len(), OPTION_COUNT, "{quiz:?}");
        assert!(quiz.options.contains(&quiz.answer), "{quiz:?}");
        assert!(quiz.options.iter().all(|o| !o.trim().is_empty()), "{quiz:?}");
    }

    #[test]
    fn test_complete_reply() {
        let quiz = normalize(r#"{"question":"Q?","options":["w","x","y","z"],"answer":"y"}"#);
        assert_eq!(quiz.question, "Q?");
        assert_eq!(quiz.options, vec!["w", "x", "y", "z"]);
        assert_eq!(quiz.answer, "y");
    }

    #[test]
    fn test_two_options_padded() {
        let quiz = normalize(r#"{"question":"Q?","options":["X","Y"],"answer":"X"}"#);
        assert_eq!(quiz.options, vec!["X", "Y", "A", "B"]);
        assert_eq!(quiz.answer, "X");
    }

    #[test]
    fn test_padding_skips_existing_fillers() {
        let quiz = normalize(r#"{"question":"Q?","options":["A","C"],"answer":"C"}"#);
        assert_eq!(quiz.options, vec!["A", "C", "B", "D"]);
        assert_eq!(quiz.answer, "C");
    }

    #[test]
    fn test_missing_options() {
        let quiz = normalize(r#"{"question":"Q?","answer":"B"}"#);
        assert_eq!(quiz.options, vec!["A", "B", "C", "D"]);
        assert_eq!(quiz.answer, "B");
    }

    #[test]
    fn test_missing_answer_defaults_to_first() {
        let quiz = normalize(r#"{"question":"Q?","options":["w","x","y","z"]}"#);
        assert_eq!(quiz.answer, "w");
        let quiz = normalize(r#"{"question":"Q?","options":["w","x","y","z"],"answer":"  "}"#);
        assert_eq!(quiz.answer, "w");
    }

    #[test]
    fn test_code_fence_stripped() {
        let reply = "```json\n{\"question\":\"Q?\",\"options\":[\"a1\",\"b1\",\"c1\",\"d1\"],\"answer\":\"b1\"}\n```";
        let quiz = normalize(reply);
        assert_eq!(quiz.question, "Q?");
        assert_eq!(quiz.answer, "b1");
    }

    #[test]
    fn test_prose_around_json() {
        let reply = "Here is your quiz:\n{\"question\":\"Q?\",\"options\":[\"a1\",\"b1\",\"c1\",\"d1\"],\"answer\":\"c1\"}\nGood luck!";
        let quiz = normalize(reply);
        assert_eq!(quiz.question, "Q?");
        assert_eq!(quiz.answer, "c1");
    }

    #[test]
    fn test_non_json_fallback() {
        let quiz = normalize("What is the capital?\nPick one.");
        assert_eq!(quiz.question, "What is the capital?");
        assert_eq!(quiz.options, vec!["A", "B", "C", "D"]);
        assert_eq!(quiz.answer, "A");
    }

    #[test]
    fn test_empty_reply_fallback() {
        let quiz = normalize("");
        assert_eq!(quiz.question, "");
        assert_well_formed(&quiz);
    }

    #[test]
    fn test_missing_question_falls_back() {
        let quiz = normalize(r#"{"options":["w","x","y","z"],"answer":"w"}"#);
        assert_eq!(quiz.options, vec!["A", "B", "C", "D"]);
        assert_eq!(quiz.answer, "A");
    }

    #[test]
    fn test_too_many_options_keeps_answer() {
        let quiz = normalize(r#"{"question":"Q?","options":["1","2","3","4","5","6"],"answer":"6"}"#);
        assert_eq!(quiz.options, vec!["1", "2", "3", "6"]);
        assert_eq!(quiz.answer, "6");
    }

    #[test]
    fn test_answer_resolution() {
        let quiz = normalize(r#"{"question":"Q?","options":["Paris","Rome","Oslo","Bern"],"answer":" paris "}"#);
        assert_eq!(quiz.answer, "Paris");
        let quiz = normalize(r#"{"question":"Q?","options":["Paris","Rome","Oslo","Bern"],"answer":"c)"}"#);
        assert_eq!(quiz.answer, "Oslo");
        let quiz = normalize(r#"{"question":"Q?","options":["Paris","Rome","Oslo","Bern"],"answer":"Madrid"}"#);
        assert_eq!(quiz.answer, "Paris");
    }

    #[test]
    fn test_always_well_formed() {
        let replies = [
            "",
            "   ",
            "not json at all",
            "{",
            "[]",
            "null",
            r#"{"question":"Q"}"#,
            r#"{"question":"Q","options":[]}"#,
            r#"{"question":"Q","options":["only"],"answer":"nope"}"#,
            r#"{"question":"Q","options":["a","b","c","d","e"],"answer":"e"}"#,
            r#"{"question":"Q","options":"not a list"}"#,
            "```\n```",
            r#"{"question":"Q","options":["","  ","x"],"answer":"x"}"#,
            r#"{"question":"Q","options":["","",""," "],"answer":""}"#,
        ];
        for reply in replies {
            assert_well_formed(&normalize(reply));
        }
    }

    #[test]
    fn test_blank_options_dropped_before_padding() {
        let quiz = normalize(r#"{"question":"Q?","options":["","  ","x"],"answer":"x"}"#);
        assert_eq!(quiz.options, vec!["x", "A", "B", "C"]);
        assert_eq!(quiz.answer, "x");
    }

    #[test]
    fn test_strip_code_fences_without_fence() {
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_parse_reply_reports_failure() {
        assert!(parse_reply("no braces here").is_err());
        assert!(parse_reply(r#"{"question": 5}"#).is_err());
    }

    #[test]
    fn test_prompt_contains_excerpt() {
        let p = prompt("the excerpt");
        assert!(p.contains("the excerpt"));
        assert!(p.contains("question, options and answer"));
    }
}
