//! Reply post-processing

use serde::{Deserialize, Serialize};

/// Marker separating a reasoning model's chain of thought from its answer.
/// Matched case-sensitively; only the first occurrence splits.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// What the client receives for a successful chat turn.
/// `reasoning` is always present and empty when there is none.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatReply {
    pub reasoning: String,
    pub final_answer: String,
}

impl ChatReply {
    /// Reply from a model without a reasoning format, passed through untouched
    pub fn plain(reply: impl Into<String>) -> Self {
        Self {
            reasoning: String::new(),
            final_answer: reply.into(),
        }
    }

    /// Split a reasoning model's reply at the first [`FINAL_ANSWER_MARKER`]
    pub fn split_reasoning(reply: &str) -> Self {
        match reply.split_once(FINAL_ANSWER_MARKER) {
            Some((reasoning, answer)) => Self {
                reasoning: reasoning.trim().to_string(),
                final_answer: answer.trim().to_string(),
            },
            None => Self {
                reasoning: String::new(),
                final_answer: reply.trim().to_string(),
            },
        }
    }
}
