//! One-line summaries of upstream completion calls

use crate::upstream::ChatCompletionRequest;

/// Format an outgoing completion request in compact form:
/// `→ model=<id> msgs=<n> "<latest user message>"`
pub fn format_request_log(request: &ChatCompletionRequest) -> String {
    let mut parts = vec![
        format!("model={}", request.model),
        format!("msgs={}", request.messages.len()),
    ];

    if let Some(msg) = latest_user_message(request) {
        parts.push(format!("\"{}\"", msg));
    }

    format!("→ {}", parts.join(" "))
}

/// Format the outcome of a completion call
pub fn format_response_log(model: &str, elapsed_ms: u128, reply_chars: usize) -> String {
    format!("← model={} {}ms chars={}", model, elapsed_ms, reply_chars)
}

/// Characters of a logged message kept before and after the elision
const LOG_HEAD_CHARS: usize = 25;
const LOG_TAIL_CHARS: usize = 75;
const LOG_ELISION: &str = " ... ";

/// The newest user message on one line, shortened for the log
fn latest_user_message(request: &ChatCompletionRequest) -> Option<String> {
    let msg = request.messages.iter().rev().find(|m| m.role == "user")?;
    Some(elide_middle(&collapse_whitespace(&msg.content)))
}

/// Every whitespace run becomes one space
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the head and tail of a long message; short ones pass unchanged
fn elide_middle(s: &str) -> String {
    let total = s.chars().count();
    if total <= LOG_HEAD_CHARS + LOG_TAIL_CHARS {
        return s.to_string();
    }

    let head: String = s.chars().take(LOG_HEAD_CHARS).collect();
    let tail: String = s.chars().skip(total - LOG_TAIL_CHARS).collect();
    format!("{head}{LOG_ELISION}{tail}")
}
