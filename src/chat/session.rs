//! Core chat session management.
//!
//! This module provides the `ChatSession` struct, which owns the session
//! context, the thread, the conversation and the durable storage, and runs
//! one question/answer turn at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chat::config::ChatConfig;
use crate::client::{Backend, ChatBackend};
use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::evaluation::{EvaluationOutcome, EvaluationPolicy, EvaluationReporter};
use crate::ids::IdGenerator;
use crate::notify::{Notice, Notifier};
use crate::observability::STREAM_ERRORS;
use crate::render::Renderer;
use crate::session::SessionContext;
use crate::storage::{FileStorage, Storage};
use crate::stream::{ResponseAssembler, read_response};
use crate::suggestions;
use crate::thread::ThreadSlot;
use crate::types::{ChatRequest, Message, MessageId, SessionToken, ThreadId, Verdict};

/// Text of the bot message posted when no thread could be opened.
pub const THREAD_FAILURE_TEXT: &str = "Could not create a conversation thread.";

/// How a turn ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// The answer streamed to the end.
    Completed,
    /// No thread could be opened; no answer was requested.
    ThreadFailed,
    /// The answer request or its stream failed.
    StreamFailed,
}

/// The messages a turn added to the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// The user's question.
    pub user_id: MessageId,
    /// The answer, under its final id.  Absent when no thread was opened.
    pub answer_id: Option<MessageId>,
    /// The synthetic error message, if the turn failed.
    pub error_id: Option<MessageId>,
    /// How the turn ended.
    pub status: TurnStatus,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// How many of them the service wrote.
    pub bot_message_count: usize,
    /// How many bot messages carry feedback.
    pub evaluated_count: usize,
    /// The current thread, if one is open.
    pub thread_id: Option<ThreadId>,
    /// Whether a session token is held.
    pub has_session: bool,
    /// Whether an answer is streaming right now.
    pub responding: bool,
    /// What happens to feedback whose post failed.
    pub evaluation_policy: EvaluationPolicy,
}

/// Sets the responding flag for as long as it lives.
struct RespondingGuard {
    flag: Arc<AtomicBool>,
}

impl RespondingGuard {
    fn engage(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::busy("an answer is still streaming"))?;
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for RespondingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A chat session against one service.
pub struct ChatSession<B: ChatBackend = Backend> {
    backend: B,
    storage: Box<dyn Storage>,
    config: ChatConfig,
    session: SessionContext,
    thread: ThreadSlot,
    conversation: Conversation,
    ids: IdGenerator,
    reporter: EvaluationReporter,
    responding: Arc<AtomicBool>,
}

impl ChatSession<Backend> {
    /// Creates a session talking HTTP to the configured service, with state
    /// kept in the configured file.
    pub fn from_config(config: ChatConfig) -> Result<Self> {
        let backend = Backend::new(config.base_url.clone(), config.timeout)?;
        let storage = FileStorage::open(&config.state_path)?;
        Ok(Self::with_backend(backend, Box::new(storage), config))
    }
}

impl<B: ChatBackend> ChatSession<B> {
    /// Creates a session over an arbitrary backend and storage.
    pub fn with_backend(backend: B, storage: Box<dyn Storage>, config: ChatConfig) -> Self {
        let reporter = EvaluationReporter::new(config.evaluation_policy, config.notice_duration);
        Self {
            backend,
            storage,
            config,
            session: SessionContext::new(),
            thread: ThreadSlot::new(),
            conversation: Conversation::new(),
            ids: IdGenerator::new(),
            reporter,
            responding: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Establishes the session token.  Call once at startup, and again to
    /// sign back in after [`ChatSession::logout`].
    pub async fn start(&mut self) -> Result<SessionToken> {
        self.session
            .ensure_session(&self.backend, self.storage.as_mut())
            .await
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The backend requests go to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The durable storage in use.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// The live session token.
    pub fn token(&self) -> Option<&SessionToken> {
        self.session.token()
    }

    /// Returns true once a session token is held.
    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// The open thread, if any.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread.current()
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns true while an answer is streaming.
    pub fn is_responding(&self) -> bool {
        self.responding.load(Ordering::Acquire)
    }

    /// A handle on the responding flag, readable while a send is in flight.
    pub fn responding_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.responding)
    }

    /// Opens a thread if none is open.
    pub async fn ensure_thread(&mut self) -> Result<ThreadId> {
        let token = self
            .session
            .token()
            .cloned()
            .ok_or_else(|| Error::not_ready("no session token"))?;
        self.thread.ensure_thread(&self.backend, &token).await
    }

    /// Asks `question` and streams the answer into the conversation.
    ///
    /// Refused without any change when the question is empty or too long,
    /// when there is no session, or while another answer is streaming.
    /// Failures after the question is accepted are reported in the
    /// conversation as bot messages and through `renderer`; they do not make
    /// this method return an error.
    pub async fn send(&mut self, question: &str, renderer: &mut dyn Renderer) -> Result<Turn> {
        let trimmed = question.trim();
        if trimmed.is_empty() {
            return Err(Error::validation(
                "question is empty",
                Some("question".to_string()),
            ));
        }
        let length = question.chars().count();
        if length > self.config.max_question_chars {
            return Err(Error::validation(
                format!(
                    "question is {length} characters long; the limit is {}",
                    self.config.max_question_chars
                ),
                Some("question".to_string()),
            ));
        }
        let token = self
            .session
            .token()
            .cloned()
            .ok_or_else(|| Error::not_ready("no session token"))?;
        let _guard = RespondingGuard::engage(&self.responding)?;

        let user_id = self.next_free_id();
        self.conversation.append(Message::user(user_id, trimmed))?;

        let thread_id = match self.thread.ensure_thread(&self.backend, &token).await {
            Ok(thread_id) => thread_id,
            Err(_) => {
                let error_id = self.post_error(THREAD_FAILURE_TEXT, renderer)?;
                return Ok(Turn {
                    user_id,
                    answer_id: None,
                    error_id: Some(error_id),
                    status: TurnStatus::ThreadFailed,
                });
            }
        };

        let placeholder = self.next_free_id();
        self.conversation.append(Message::bot(placeholder, ""))?;
        renderer.start_response(placeholder);

        let mut assembler = ResponseAssembler::new(placeholder);
        let request = ChatRequest::new(trimmed, thread_id);
        let outcome = match self.backend.chat(&token, &request).await {
            Ok(chunks) => {
                read_response(
                    &mut self.conversation,
                    &mut self.ids,
                    &mut assembler,
                    chunks,
                    renderer,
                )
                .await
            }
            Err(err) => Err(err),
        };
        renderer.finish_response();

        match outcome {
            Ok(answer_id) => Ok(Turn {
                user_id,
                answer_id: Some(answer_id),
                error_id: None,
                status: TurnStatus::Completed,
            }),
            Err(err) => {
                STREAM_ERRORS.click();
                tracing::warn!(error = %err, "answer stream failed");
                let error_id = self.post_error(&format!("Error: {err}"), renderer)?;
                Ok(Turn {
                    user_id,
                    answer_id: Some(assembler.active_id()),
                    error_id: Some(error_id),
                    status: TurnStatus::StreamFailed,
                })
            }
        }
    }

    fn next_free_id(&mut self) -> MessageId {
        loop {
            let id = self.ids.next_id();
            if self.conversation.get(id).is_none() {
                return id;
            }
        }
    }

    fn post_error(&mut self, text: &str, renderer: &mut dyn Renderer) -> Result<MessageId> {
        let id = self.next_free_id();
        self.conversation.append(Message::bot(id, text))?;
        renderer.print_error(text);
        Ok(id)
    }

    /// Records feedback on bot message `message_id`.
    pub async fn evaluate(
        &mut self,
        message_id: MessageId,
        verdict: Verdict,
        notifier: &mut dyn Notifier,
    ) -> Result<EvaluationOutcome> {
        self.reporter
            .evaluate(
                &self.backend,
                self.session.token(),
                self.thread.current(),
                &mut self.conversation,
                message_id,
                verdict,
                notifier,
            )
            .await
    }

    /// Records feedback on the most recent bot message.
    pub async fn evaluate_latest(
        &mut self,
        verdict: Verdict,
        notifier: &mut dyn Notifier,
    ) -> Result<EvaluationOutcome> {
        let Some(latest) = self.conversation.last_bot().map(|m| m.id) else {
            return Err(Error::validation(
                "there is no answer to evaluate",
                Some("message_id".to_string()),
            ));
        };
        self.evaluate(latest, verdict, notifier).await
    }

    /// A random sample of example questions.
    pub async fn example_questions(&mut self, notifier: &mut dyn Notifier) -> Result<Vec<String>> {
        let result = suggestions::example_questions(
            &self.backend,
            self.session.token(),
            self.storage.as_mut(),
            self.config.example_count,
        )
        .await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "example questions unavailable");
            notifier.notify(Notice::warning(
                "Example questions are unavailable.",
                self.config.notice_duration,
            ));
        }
        result
    }

    /// Starts over: the next question opens a new thread.
    pub fn new_conversation(&mut self) {
        self.thread.reset();
        self.conversation.clear();
    }

    /// Forgets the session token and the thread.
    pub fn logout(&mut self) -> Result<()> {
        self.thread.reset();
        self.session.clear(self.storage.as_mut())
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let messages = self.conversation.messages();
        SessionStats {
            message_count: messages.len(),
            bot_message_count: messages.iter().filter(|m| m.is_bot()).count(),
            evaluated_count: messages.iter().filter(|m| !m.evaluation.is_none()).count(),
            thread_id: self.thread.current().cloned(),
            has_session: self.session.is_ready(),
            responding: self.is_responding(),
            evaluation_policy: self.reporter.policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, SESSION_TOKEN_KEY};
    use crate::testing::{Call, ChatScript, FakeBackend, RecordingRenderer};
    use crate::types::{Author, Evaluation};
    use tokio_test::{assert_pending, task};

    async fn started(backend: FakeBackend) -> ChatSession<FakeBackend> {
        started_with(backend, ChatConfig::new()).await
    }

    async fn started_with(backend: FakeBackend, config: ChatConfig) -> ChatSession<FakeBackend> {
        let mut session =
            ChatSession::with_backend(backend, Box::new(MemoryStorage::new()), config);
        session.start().await.unwrap();
        session
    }

    fn ready_backend() -> FakeBackend {
        FakeBackend::new().with_auth_token("abc").with_thread_id("t1")
    }

    #[tokio::test]
    async fn full_turn() {
        let backend = ready_backend().with_chat(ChatScript::text(&[
            "Hi",
            " there",
            r#"{"done":true,"messageId":42}"#,
        ]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();

        let turn = session.send("Hello", &mut renderer).await.unwrap();

        assert_eq!(turn.status, TurnStatus::Completed);
        assert_eq!(turn.answer_id, Some(MessageId(42)));
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author, Author::User);
        assert_eq!(messages[0].text, "Hello");
        assert_eq!(messages[1].id, MessageId(42));
        assert_eq!(messages[1].text, "Hi there");
        assert!(!session.is_responding());
        assert_eq!(renderer.text, "Hi there");
        assert_eq!(renderer.finished, 1);
        assert_eq!(
            session.backend().calls(),
            vec![
                Call::Authenticate,
                Call::CreateThread("abc".to_string()),
                Call::Chat(ChatRequest::new("Hello", ThreadId::new("t1"))),
            ]
        );
        assert_eq!(
            session.storage().get(SESSION_TOKEN_KEY).unwrap().as_deref(),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn largest_server_id_does_not_block_later_turns() {
        let top = format!(r#"{{"done":true,"messageId":{}}}"#, u64::MAX);
        let backend = ready_backend()
            .with_chat(ChatScript::text(&["one", top.as_str()]))
            .with_chat(ChatScript::text(&["two"]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();

        let first = session.send("Hello", &mut renderer).await.unwrap();
        assert_eq!(first.answer_id, Some(MessageId(u64::MAX)));
        let second = session.send("Hello again", &mut renderer).await.unwrap();

        assert_eq!(second.status, TurnStatus::Completed);
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].text, "Hello again");
        assert_eq!(messages[3].text, "two");
        let mut ids: Vec<_> = messages.iter().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn thread_is_reused_across_turns() {
        let backend = ready_backend()
            .with_chat(ChatScript::text(&["one"]))
            .with_chat(ChatScript::text(&["two"]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();

        session.send("first", &mut renderer).await.unwrap();
        session.send("second", &mut renderer).await.unwrap();

        let backend = session.backend();
        assert_eq!(backend.count(|c| matches!(c, Call::CreateThread(_))), 1);
        assert_eq!(backend.count(|c| matches!(c, Call::Chat(_))), 2);
        assert_eq!(session.conversation().len(), 4);
    }

    #[tokio::test]
    async fn chat_status_failure_posts_error_message() {
        let backend = ready_backend().with_chat(ChatScript::Fail(Error::internal_server("boom")));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();

        let turn = session.send("Hello", &mut renderer).await.unwrap();

        assert_eq!(turn.status, TurnStatus::StreamFailed);
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].author, Author::Bot);
        assert_eq!(messages[1].text, "");
        assert_eq!(messages[2].author, Author::Bot);
        assert!(messages[2].text.starts_with("Error: "));
        assert!(messages[2].text.contains("boom"));
        assert!(!session.is_responding());
        assert_eq!(renderer.errors.len(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial_text() {
        let backend = ready_backend().with_chat(ChatScript::Chunks(vec![
            Ok("partial".to_string()),
            Err(Error::streaming("connection reset", None)),
        ]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();

        let turn = session.send("Hello", &mut renderer).await.unwrap();

        assert_eq!(turn.status, TurnStatus::StreamFailed);
        let messages = session.conversation().messages();
        assert_eq!(messages[1].text, "partial");
        assert_eq!(Some(messages[1].id), turn.answer_id);
        assert_eq!(Some(messages[2].id), turn.error_id);
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn thread_failure_skips_placeholder() {
        let backend = FakeBackend::new().with_auth_token("abc");
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();

        let turn = session.send("Hello", &mut renderer).await.unwrap();

        assert_eq!(turn.status, TurnStatus::ThreadFailed);
        assert_eq!(turn.answer_id, None);
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, THREAD_FAILURE_TEXT);
        assert_eq!(session.backend().count(|c| matches!(c, Call::Chat(_))), 0);
        assert!(renderer.started.is_empty());
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn busy_send_changes_nothing() {
        let mut session = started(ready_backend()).await;
        let mut renderer = RecordingRenderer::default();
        session.responding_flag().store(true, Ordering::SeqCst);

        let err = session.send("Hello", &mut renderer).await.unwrap_err();

        assert!(err.is_busy());
        assert!(session.conversation().is_empty());
        assert_eq!(session.backend().count(|c| matches!(c, Call::Chat(_))), 0);
        assert!(session.is_responding());
    }

    #[tokio::test]
    async fn hung_stream_keeps_flag_set() {
        let backend = ready_backend().with_chat(ChatScript::Hang(vec!["Hi".to_string()]));
        let mut session = started(backend).await;
        let flag = session.responding_flag();
        let mut renderer = RecordingRenderer::default();

        {
            let mut send = task::spawn(session.send("Hello", &mut renderer));
            assert_pending!(send.poll());
            assert!(flag.load(Ordering::SeqCst));
            assert_pending!(send.poll());
            assert!(flag.load(Ordering::SeqCst));
        }

        assert_eq!(renderer.text, "Hi");
        assert_eq!(renderer.finished, 0);
    }

    #[tokio::test]
    async fn refused_input_changes_nothing() {
        let config = ChatConfig::new().with_max_question_chars(5);
        let mut session = started_with(ready_backend(), config).await;
        let mut renderer = RecordingRenderer::default();

        assert!(session.send("   ", &mut renderer).await.unwrap_err().is_validation());
        assert!(session.send("toolong", &mut renderer).await.unwrap_err().is_validation());
        assert!(session.send("  abc  ", &mut renderer).await.unwrap_err().is_validation());
        assert!(session.conversation().is_empty());
        assert_eq!(session.backend().count(|c| matches!(c, Call::CreateThread(_))), 0);
        assert!(!session.is_responding());
    }

    #[tokio::test]
    async fn accepted_input_is_stored_trimmed() {
        let config = ChatConfig::new().with_max_question_chars(5);
        let backend = ready_backend().with_chat(ChatScript::text(&["ok"]));
        let mut session = started_with(backend, config).await;
        let mut renderer = RecordingRenderer::default();

        session.send(" abc ", &mut renderer).await.unwrap();

        assert_eq!(session.conversation().messages()[0].text, "abc");
    }

    #[tokio::test]
    async fn send_without_session_is_not_ready() {
        let mut session = ChatSession::with_backend(
            FakeBackend::new(),
            Box::new(MemoryStorage::new()),
            ChatConfig::new(),
        );
        assert!(session.start().await.is_err());
        let mut renderer = RecordingRenderer::default();

        let err = session.send("Hello", &mut renderer).await.unwrap_err();
        assert!(err.is_not_ready());
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn feedback_on_latest_answer() {
        let backend = ready_backend().with_chat(ChatScript::text(&[
            "Hi",
            r#"{"done":true,"messageId":42}"#,
        ]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();
        let mut notices = Vec::new();
        session.send("Hello", &mut renderer).await.unwrap();

        let outcome = session
            .evaluate_latest(Verdict::Positive, &mut notices)
            .await
            .unwrap();

        assert_eq!(outcome, EvaluationOutcome::Recorded);
        assert_eq!(
            session.conversation().get(MessageId(42)).unwrap().evaluation,
            Evaluation::Positive
        );
        assert_eq!(session.stats().evaluated_count, 1);
    }

    #[tokio::test]
    async fn feedback_before_any_thread_is_skipped() {
        let mut session = started(ready_backend()).await;
        let mut notices = Vec::new();
        let err = session
            .evaluate_latest(Verdict::Positive, &mut notices)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let outcome = session
            .evaluate(MessageId(1), Verdict::Positive, &mut notices)
            .await
            .unwrap();
        assert_eq!(outcome, EvaluationOutcome::Skipped);
    }

    #[tokio::test]
    async fn new_conversation_opens_new_thread() {
        let backend = ready_backend()
            .with_chat(ChatScript::text(&["one"]))
            .with_chat(ChatScript::text(&["two"]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();

        session.send("first", &mut renderer).await.unwrap();
        session.new_conversation();
        assert!(session.conversation().is_empty());
        assert!(session.thread_id().is_none());
        session.send("second", &mut renderer).await.unwrap();

        assert_eq!(
            session
                .backend()
                .count(|c| matches!(c, Call::CreateThread(_))),
            2
        );
    }

    #[tokio::test]
    async fn logout_clears_token_and_thread() {
        let backend = ready_backend().with_chat(ChatScript::text(&["one"]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();
        session.send("first", &mut renderer).await.unwrap();

        session.logout().unwrap();

        assert!(!session.is_ready());
        assert!(session.thread_id().is_none());
        assert_eq!(session.storage().get(SESSION_TOKEN_KEY).unwrap(), None);
        assert_eq!(session.conversation().len(), 2);
        let err = session.send("again", &mut renderer).await.unwrap_err();
        assert!(err.is_not_ready());
    }

    #[tokio::test]
    async fn example_failure_is_a_notice() {
        let mut session = started(ready_backend()).await;
        let mut notices = Vec::new();
        assert!(session.example_questions(&mut notices).await.is_err());
        assert_eq!(notices.len(), 1);
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn stats_snapshot() {
        let backend = ready_backend().with_chat(ChatScript::text(&["one"]));
        let mut session = started(backend).await;
        let mut renderer = RecordingRenderer::default();
        session.send("first", &mut renderer).await.unwrap();

        let stats = session.stats();
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.bot_message_count, 1);
        assert_eq!(stats.thread_id, Some(ThreadId::new("t1")));
        assert!(stats.has_session);
        assert!(!stats.responding);
        assert_eq!(stats.evaluation_policy, EvaluationPolicy::KeepOnFailure);
    }
}
