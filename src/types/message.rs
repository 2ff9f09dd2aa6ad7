use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Evaluation, MessageId};

/// Who wrote a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    /// The person using the client.
    User,

    /// The remote service.
    Bot,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::User => write!(f, "You"),
            Author::Bot => write!(f, "Bot"),
        }
    }
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique id within the conversation.
    pub id: MessageId,

    /// The text as currently rendered.
    pub text: String,

    /// Who wrote the message.
    pub author: Author,

    /// Feedback state; only meaningful for bot messages.
    pub evaluation: Evaluation,
}

impl Message {
    /// Create a new `Message` with no evaluation.
    pub fn new(id: MessageId, text: impl Into<String>, author: Author) -> Self {
        Self {
            id,
            text: text.into(),
            author,
            evaluation: Evaluation::None,
        }
    }

    /// Create a user-authored message.
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, Author::User)
    }

    /// Create a bot-authored message.
    pub fn bot(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, Author::Bot)
    }

    /// Returns true if the service wrote this message.
    pub fn is_bot(&self) -> bool {
        self.author == Author::Bot
    }
}
