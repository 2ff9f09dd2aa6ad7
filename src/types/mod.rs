// Public modules
pub mod auth_response;
pub mod chat_request;
pub mod completion_marker;
pub mod evaluation;
pub mod evaluation_request;
pub mod example_questions_response;
pub mod message;
pub mod message_id;
pub mod session_token;
pub mod thread_create_response;
pub mod thread_id;

// Re-exports
pub use auth_response::AuthResponse;
pub use chat_request::ChatRequest;
pub use completion_marker::{COMPLETION_SENTINEL, CompletionMarker};
pub use evaluation::{Evaluation, Verdict, VerdictParseError};
pub use evaluation_request::EvaluationRequest;
pub use example_questions_response::ExampleQuestionsResponse;
pub use message::{Author, Message};
pub use message_id::MessageId;
pub use session_token::SessionToken;
pub use thread_create_response::ThreadCreateResponse;
pub use thread_id::ThreadId;
