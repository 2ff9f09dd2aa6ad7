//! Client for thread-based streaming chat services.
//!
//! The library obtains a session token, opens a conversation thread lazily,
//! streams answers into an ordered conversation, and posts feedback on them.
//! The [`chat`] module adds an interactive terminal front end.

// Public modules
pub mod chat;
pub mod chunks;
pub mod client;
pub mod conversation;
pub mod error;
pub mod evaluation;
pub mod ids;
pub mod notify;
pub mod render;
pub mod session;
pub mod storage;
pub mod stream;
pub mod suggestions;
pub mod thread;
pub mod types;

mod observability;

#[cfg(test)]
mod testing;

// Re-exports
pub use chunks::{Fragment, Utf8ChunkDecoder, decode_chunks, split_chunk};
pub use client::{BASE_URL_ENV, Backend, ChatBackend, ChunkStream};
pub use conversation::{Conversation, MessageUpdate};
pub use error::{Error, Result};
pub use evaluation::{
    EvaluationOutcome, EvaluationPolicy, EvaluationReporter, FEEDBACK_FAILED, FEEDBACK_THANKS,
};
pub use ids::IdGenerator;
pub use notify::{Notice, NoticeLevel, Notifier};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use session::SessionContext;
pub use storage::{
    EXAMPLE_QUESTIONS_KEY, FileStorage, MemoryStorage, SESSION_TOKEN_KEY, Storage,
};
pub use stream::{ResponseAssembler, StreamStep, read_response};
pub use thread::ThreadSlot;
pub use types::*;
