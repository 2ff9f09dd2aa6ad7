//! The ordered message log shown to the user.
//!
//! Insertion order is chronological send order and is never changed: the log
//! is append-only apart from in-place edits made through
//! [`Conversation::update_by_id`].  Only the stream reader and the evaluation
//! reporter mutate it, which is why the mutators are crate-private.

use crate::error::{Error, Result};
use crate::types::{Author, Evaluation, Message, MessageId};

/// Fields to change on an existing message.  `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageUpdate {
    /// Replacement id.
    pub id: Option<MessageId>,
    /// Replacement text (the full text, not a delta).
    pub text: Option<String>,
    /// New evaluation.
    pub evaluation: Option<Evaluation>,
}

impl MessageUpdate {
    /// An update that replaces the text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// An update that renumbers the message.
    pub fn id(id: MessageId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// An update that records an evaluation.
    pub fn evaluation(evaluation: Evaluation) -> Self {
        Self {
            evaluation: Some(evaluation),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.id.is_none() && self.text.is_none() && self.evaluation.is_none()
    }
}

/// Ordered log of user and bot messages.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Looks up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if no message has been appended.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent bot message, if any.
    pub fn last_bot(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_bot())
    }

    /// Appends a message.  Fails if the id is already in use.
    pub(crate) fn append(&mut self, message: Message) -> Result<()> {
        if self.get(message.id).is_some() {
            return Err(Error::validation(
                format!("message id {} is already in use", message.id),
                Some("id".to_string()),
            ));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Applies `update` to the message with `id`.
    ///
    /// Returns `Ok(false)` if no message has that id.  Refuses to edit user
    /// messages, to reuse another message's id, or to change an evaluation
    /// that has already left `None`.
    pub(crate) fn update_by_id(&mut self, id: MessageId, update: MessageUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(self.get(id).is_some());
        }
        if let Some(new_id) = update.id
            && new_id != id
            && self.get(new_id).is_some()
        {
            return Err(Error::validation(
                format!("message id {new_id} is already in use"),
                Some("id".to_string()),
            ));
        }
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return Ok(false);
        };
        if message.author == Author::User {
            return Err(Error::validation(
                format!("message {id} was written by the user and cannot change"),
                Some("id".to_string()),
            ));
        }
        if let Some(evaluation) = update.evaluation
            && (evaluation.is_none() || !message.evaluation.is_none())
        {
            return Err(Error::validation(
                format!("message {id} is already evaluated"),
                Some("evaluation".to_string()),
            ));
        }
        if let Some(text) = update.text {
            message.text = text;
        }
        if let Some(evaluation) = update.evaluation {
            message.evaluation = evaluation;
        }
        if let Some(new_id) = update.id {
            message.id = new_id;
        }
        Ok(true)
    }

    /// Puts an evaluation back to `None`.  Used only when the configured
    /// policy undoes optimistic feedback after a failed post.
    pub(crate) fn reset_evaluation(&mut self, id: MessageId) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.evaluation = Evaluation::None;
                true
            }
            None => false,
        }
    }

    /// Removes every message.
    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }
}
