//! Transient user notifications.
//!
//! Displaying a notice is the front end's job; the core only decides what to
//! say, how loudly, and for how long.

use std::fmt;
use std::time::Duration;

/// How a notice should be styled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something worked.
    Success,
    /// Neutral information.
    Info,
    /// Something degraded but the client carries on.
    Warning,
    /// Something failed.
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Success => write!(f, "success"),
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// A short-lived message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Styling.
    pub level: NoticeLevel,
    /// Text to show.
    pub message: String,
    /// How long the notice stays visible.
    pub duration: Duration,
}

impl Notice {
    /// Create a new `Notice`.
    pub fn new(level: NoticeLevel, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            level,
            message: message.into(),
            duration,
        }
    }

    /// A success notice.
    pub fn success(message: impl Into<String>, duration: Duration) -> Self {
        Self::new(NoticeLevel::Success, message, duration)
    }

    /// An informational notice.
    pub fn info(message: impl Into<String>, duration: Duration) -> Self {
        Self::new(NoticeLevel::Info, message, duration)
    }

    /// A warning notice.
    pub fn warning(message: impl Into<String>, duration: Duration) -> Self {
        Self::new(NoticeLevel::Warning, message, duration)
    }

    /// An error notice.
    pub fn error(message: impl Into<String>, duration: Duration) -> Self {
        Self::new(NoticeLevel::Error, message, duration)
    }
}

/// Anything that can show notices to the user.
pub trait Notifier: Send {
    /// Show `notice`.
    fn notify(&mut self, notice: Notice);
}

impl Notifier for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}
