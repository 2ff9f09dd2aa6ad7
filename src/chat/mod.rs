//! Interactive chat front end.
//!
//! This module drives the library from a terminal REPL.  It supports:
//!
//! - Streaming answers with real-time display
//! - Thumbs up/down feedback on answers
//! - Example questions for an empty conversation
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: turn orchestration over the session, thread and stream
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{
    ChatArgs, ChatConfig, DEFAULT_EXAMPLE_COUNT, DEFAULT_MAX_QUESTION_CHARS,
    DEFAULT_NOTICE_DURATION, DEFAULT_STATE_FILE,
};
pub use session::{ChatSession, SessionStats, THREAD_FAILURE_TEXT, Turn, TurnStatus};
