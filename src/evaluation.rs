//! User feedback on bot answers.
//!
//! Feedback is applied to the conversation before the service confirms it.
//! What happens to that optimistic value when the post fails is a choice made
//! through [`EvaluationPolicy`].

use std::time::Duration;

use crate::client::ChatBackend;
use crate::conversation::{Conversation, MessageUpdate};
use crate::error::{Error, Result};
use crate::notify::{Notice, Notifier};
use crate::observability::{EVALUATION_ERRORS, EVALUATIONS};
use crate::types::{EvaluationRequest, MessageId, SessionToken, ThreadId, Verdict};

/// Notice shown when feedback was accepted.
pub const FEEDBACK_THANKS: &str = "Thanks for your feedback!";

/// Notice shown when feedback could not be delivered.
pub const FEEDBACK_FAILED: &str = "Your feedback could not be sent.";

/// What to do with an optimistic evaluation whose post failed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EvaluationPolicy {
    /// Leave the evaluation as the user set it.
    #[default]
    KeepOnFailure,
    /// Put the evaluation back to unset so the user can try again.
    RollbackOnFailure,
}

/// Result of an evaluation attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// There was no session or thread, so nothing happened.
    Skipped,
    /// The service accepted the feedback.
    Recorded,
    /// The post failed.  `rolled_back` tells whether the optimistic value was
    /// undone.
    Failed { rolled_back: bool },
}

/// Posts feedback and reports the result as a notice.
#[derive(Debug, Clone)]
pub struct EvaluationReporter {
    policy: EvaluationPolicy,
    notice_duration: Duration,
}

impl EvaluationReporter {
    /// Create a new `EvaluationReporter`.
    pub fn new(policy: EvaluationPolicy, notice_duration: Duration) -> Self {
        Self {
            policy,
            notice_duration,
        }
    }

    /// The failure policy in effect.
    pub fn policy(&self) -> EvaluationPolicy {
        self.policy
    }

    /// Records `verdict` on bot message `message_id` and posts it.
    ///
    /// Without a token or a thread this is a no-op.  An unknown id, a user
    /// message, or a message that already carries an evaluation is refused
    /// with [`Error::Validation`] before anything is sent.
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate<B>(
        &self,
        backend: &B,
        token: Option<&SessionToken>,
        thread: Option<&ThreadId>,
        conversation: &mut Conversation,
        message_id: MessageId,
        verdict: Verdict,
        notifier: &mut dyn Notifier,
    ) -> Result<EvaluationOutcome>
    where
        B: ChatBackend + ?Sized,
    {
        let (Some(token), Some(thread)) = (token, thread) else {
            tracing::debug!(%message_id, "no session or thread; evaluation skipped");
            return Ok(EvaluationOutcome::Skipped);
        };

        if !conversation.update_by_id(message_id, MessageUpdate::evaluation(verdict.into()))? {
            return Err(Error::validation(
                format!("no message with id {message_id}"),
                Some("message_id".to_string()),
            ));
        }

        let request = EvaluationRequest::new(thread.clone(), message_id, verdict);
        EVALUATIONS.click();
        match backend.evaluate(token, &request).await {
            Ok(()) => {
                notifier.notify(Notice::success(FEEDBACK_THANKS, self.notice_duration));
                Ok(EvaluationOutcome::Recorded)
            }
            Err(err) => {
                EVALUATION_ERRORS.click();
                let err = Error::evaluation(err.to_string());
                tracing::warn!(%message_id, error = %err, "evaluation post failed");
                notifier.notify(Notice::error(FEEDBACK_FAILED, self.notice_duration));
                let rolled_back = match self.policy {
                    EvaluationPolicy::KeepOnFailure => false,
                    EvaluationPolicy::RollbackOnFailure => {
                        conversation.reset_evaluation(message_id)
                    }
                };
                Ok(EvaluationOutcome::Failed { rolled_back })
            }
        }
    }
}

impl Default for EvaluationReporter {
    fn default() -> Self {
        Self::new(EvaluationPolicy::default(), Duration::from_secs(5))
    }
}
