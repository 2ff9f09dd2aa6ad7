use serde::{Deserialize, Serialize};

use crate::types::ThreadId;

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question, already trimmed.
    pub question: String,

    /// The thread the question belongs to.
    #[serde(rename = "threadId")]
    pub thread_id: ThreadId,
}

impl ChatRequest {
    /// Create a new `ChatRequest`.
    pub fn new(question: impl Into<String>, thread_id: ThreadId) -> Self {
        Self {
            question: question.into(),
            thread_id,
        }
    }
}
