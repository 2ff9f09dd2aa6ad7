use serde::{Deserialize, Serialize};

use crate::types::{MessageId, ThreadId, Verdict};

/// Body of `POST /evaluation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Thread containing the message.
    #[serde(rename = "threadId")]
    pub thread_id: ThreadId,

    /// The message being evaluated.
    #[serde(rename = "messageId")]
    pub message_id: MessageId,

    /// The user's verdict.
    pub evaluation: Verdict,
}

impl EvaluationRequest {
    /// Create a new `EvaluationRequest`.
    pub fn new(thread_id: ThreadId, message_id: MessageId, evaluation: Verdict) -> Self {
        Self {
            thread_id,
            message_id,
            evaluation,
        }
    }
}
