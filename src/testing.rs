//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::client::{ChatBackend, ChunkStream};
use crate::error::{Error, Result};
use crate::render::Renderer;
use crate::types::{ChatRequest, EvaluationRequest, MessageId, SessionToken, ThreadId};

/// A request the fake backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Authenticate,
    CheckToken(String),
    CreateThread(String),
    Chat(ChatRequest),
    Evaluate(EvaluationRequest),
    Examples,
}

/// How the fake answers the next chat request.
pub(crate) enum ChatScript {
    /// Yield these items, then end.
    Chunks(Vec<Result<String>>),
    /// Yield these chunks, then never finish.
    Hang(Vec<String>),
    /// Refuse the request.
    Fail(Error),
}

impl ChatScript {
    pub(crate) fn text(chunks: &[&str]) -> Self {
        ChatScript::Chunks(chunks.iter().map(|c| Ok(c.to_string())).collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    auth_token: Option<String>,
    valid_tokens: Vec<String>,
    thread_id: Option<String>,
    failing_evaluations: bool,
    examples: Option<Vec<String>>,
    chats: Mutex<VecDeque<ChatScript>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    pub(crate) fn with_valid_token(mut self, token: &str) -> Self {
        self.valid_tokens.push(token.to_string());
        self
    }

    pub(crate) fn with_thread_id(mut self, id: &str) -> Self {
        self.thread_id = Some(id.to_string());
        self
    }

    pub(crate) fn with_failing_evaluations(mut self) -> Self {
        self.failing_evaluations = true;
        self
    }

    pub(crate) fn with_examples(mut self, questions: Vec<String>) -> Self {
        self.examples = Some(questions);
        self
    }

    pub(crate) fn with_chat(self, script: ChatScript) -> Self {
        self.chats.lock().unwrap().push_back(script);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn authenticate(&self) -> Result<SessionToken> {
        self.record(Call::Authenticate);
        match &self.auth_token {
            Some(token) => Ok(SessionToken::new(token.clone())),
            None => Err(Error::internal_server("auth unavailable")),
        }
    }

    async fn check_token(&self, token: &SessionToken) -> Result<()> {
        self.record(Call::CheckToken(token.as_str().to_string()));
        if self.valid_tokens.iter().any(|t| t == token.as_str()) {
            Ok(())
        } else {
            Err(Error::authentication("token rejected"))
        }
    }

    async fn create_thread(&self, token: &SessionToken) -> Result<ThreadId> {
        self.record(Call::CreateThread(token.as_str().to_string()));
        match &self.thread_id {
            Some(id) => Ok(ThreadId::new(id.clone())),
            None => Err(Error::internal_server("thread store down")),
        }
    }

    async fn chat(&self, _token: &SessionToken, request: &ChatRequest) -> Result<ChunkStream> {
        self.record(Call::Chat(request.clone()));
        let script = self.chats.lock().unwrap().pop_front();
        match script {
            Some(ChatScript::Chunks(items)) => Ok(Box::pin(stream::iter(items))),
            Some(ChatScript::Hang(chunks)) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok::<String, Error>))
                    .chain(stream::pending()),
            )),
            Some(ChatScript::Fail(err)) => Err(err),
            None => Err(Error::internal_server("no scripted answer")),
        }
    }

    async fn evaluate(&self, _token: &SessionToken, request: &EvaluationRequest) -> Result<()> {
        self.record(Call::Evaluate(request.clone()));
        if self.failing_evaluations {
            Err(Error::service_unavailable("feedback store down", None))
        } else {
            Ok(())
        }
    }

    async fn example_questions(&self, _token: &SessionToken) -> Result<Vec<String>> {
        self.record(Call::Examples);
        self.examples
            .clone()
            .ok_or_else(|| Error::not_found("no examples"))
    }
}

/// Renderer that keeps everything it is given.
#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    pub(crate) started: Vec<MessageId>,
    pub(crate) text: String,
    pub(crate) errors: Vec<String>,
    pub(crate) infos: Vec<String>,
    pub(crate) finished: usize,
}

impl Renderer for RecordingRenderer {
    fn start_response(&mut self, id: MessageId) {
        self.started.push(id);
    }

    fn print_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.infos.push(info.to_string());
    }

    fn finish_response(&mut self) {
        self.finished += 1;
    }
}
