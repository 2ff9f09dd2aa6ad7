//! Configuration types for the chat client.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration a [`ChatSession`](super::ChatSession) runs with.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::evaluation::EvaluationPolicy;

/// Default maximum question length, in characters.
pub const DEFAULT_MAX_QUESTION_CHARS: usize = 150;

/// Default file holding durable client state.
pub const DEFAULT_STATE_FILE: &str = "chatline-state.json";

/// Default number of example questions shown.
pub const DEFAULT_EXAMPLE_COUNT: usize = 4;

/// Default time a notice stays visible.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(5);

/// Command-line arguments for the chatline tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Root URL of the chat service.
    #[arrrg(optional, "Service URL (default: $CHATLINE_BASE_URL or http://127.0.0.1:8000/)", "URL")]
    pub base_url: Option<String>,

    /// File holding the session token and cached examples.
    #[arrrg(optional, "State file (default: chatline-state.json)", "PATH")]
    pub state_file: Option<String>,

    /// Longest question accepted.
    #[arrrg(optional, "Maximum question length in characters (default: 150)", "CHARS")]
    pub max_chars: Option<u32>,

    /// Per-request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECS")]
    pub timeout_secs: Option<u32>,

    /// Undo feedback that could not be delivered.
    #[arrrg(flag, "Roll back feedback when posting it fails")]
    pub rollback_evaluations: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// Holds the resolved values after applying defaults to the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Service root; `None` defers to the environment and the built-in default.
    pub base_url: Option<String>,

    /// Per-request timeout.  `None` means requests may wait forever.
    pub timeout: Option<Duration>,

    /// Where durable state lives.
    pub state_path: PathBuf,

    /// Longest question accepted, in characters.
    pub max_question_chars: usize,

    /// What happens to feedback whose post failed.
    pub evaluation_policy: EvaluationPolicy,

    /// How long notices stay visible.
    pub notice_duration: Duration,

    /// How many example questions to offer.
    pub example_count: usize,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            max_question_chars: DEFAULT_MAX_QUESTION_CHARS,
            evaluation_policy: EvaluationPolicy::default(),
            notice_duration: DEFAULT_NOTICE_DURATION,
            example_count: DEFAULT_EXAMPLE_COUNT,
            use_color: true,
        }
    }

    /// Sets the service root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the state file.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Sets the maximum question length.
    pub fn with_max_question_chars(mut self, max: usize) -> Self {
        self.max_question_chars = max;
        self
    }

    /// Sets the evaluation failure policy.
    pub fn with_evaluation_policy(mut self, policy: EvaluationPolicy) -> Self {
        self.evaluation_policy = policy;
        self
    }

    /// Sets how long notices stay visible.
    pub fn with_notice_duration(mut self, duration: Duration) -> Self {
        self.notice_duration = duration;
        self
    }

    /// Sets how many example questions are offered.
    pub fn with_example_count(mut self, count: usize) -> Self {
        self.example_count = count;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let evaluation_policy = if args.rollback_evaluations {
            EvaluationPolicy::RollbackOnFailure
        } else {
            EvaluationPolicy::KeepOnFailure
        };

        ChatConfig {
            base_url: args.base_url,
            timeout: args.timeout_secs.map(|s| Duration::from_secs(s.into())),
            state_path: args
                .state_file
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            max_question_chars: args
                .max_chars
                .map(|c| c as usize)
                .unwrap_or(DEFAULT_MAX_QUESTION_CHARS),
            evaluation_policy,
            use_color: !args.no_color,
            ..ChatConfig::new()
        }
    }
}
