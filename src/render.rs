//! Output rendering for the chat client.
//!
//! The core reports streamed text, errors and information through the
//! [`Renderer`] trait and never writes to the terminal itself.

use std::io::{self, Stdout, Write};

use crate::notify::{Notice, NoticeLevel, Notifier};
use crate::types::{Evaluation, Message, MessageId};

/// ANSI escape code for dim text (used for message ids).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the bot label and info notices).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for success notices).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Receives the visible output of a chat turn.
pub trait Renderer: Send {
    /// Called once the placeholder for a bot answer exists.
    fn start_response(&mut self, id: MessageId) {
        let _ = id;
    }

    /// Prints a piece of streamed answer text.
    fn print_text(&mut self, text: &str);

    /// Prints an error message.
    fn print_error(&mut self, error: &str);

    /// Prints an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when the bot answer is complete, successfully or not.
    fn finish_response(&mut self);
}

/// Plain text renderer with optional ANSI styling.
///
/// Writes answers to stdout and errors to stderr.  Also shows notices, since
/// a terminal has no toast area.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_response: false,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    /// Prints one history entry.
    pub fn print_message(&mut self, message: &Message) {
        let id = self.paint(ANSI_DIM, &format!("[{}]", message.id));
        let author = if message.is_bot() {
            self.paint(ANSI_CYAN, &message.author.to_string())
        } else {
            message.author.to_string()
        };
        let evaluation = match message.evaluation {
            Evaluation::None => String::new(),
            Evaluation::Positive => format!(" {}", self.paint(ANSI_GREEN, "(+)")),
            Evaluation::Negative => format!(" {}", self.paint(ANSI_RED, "(-)")),
        };
        println!("{id} {author}: {}{evaluation}", message.text);
        self.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self, _id: MessageId) {
        let label = self.paint(ANSI_CYAN, "Bot:");
        print!("{label} ");
        self.in_response = true;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.in_response {
            println!();
            self.in_response = false;
        }
        eprintln!("{}", self.paint(ANSI_RED, error));
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }

    fn finish_response(&mut self) {
        if self.in_response {
            println!();
            self.in_response = false;
        }
        self.flush();
    }
}

impl Notifier for PlainTextRenderer {
    fn notify(&mut self, notice: Notice) {
        let color = match notice.level {
            NoticeLevel::Success => ANSI_GREEN,
            NoticeLevel::Info => ANSI_CYAN,
            NoticeLevel::Warning => ANSI_YELLOW,
            NoticeLevel::Error => ANSI_RED,
        };
        let line = self.paint(color, &notice.message);
        match notice.level {
            NoticeLevel::Error | NoticeLevel::Warning => eprintln!("{line}"),
            NoticeLevel::Success | NoticeLevel::Info => println!("{line}"),
        }
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        assert_eq!(renderer.paint(ANSI_RED, "x"), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.paint(ANSI_RED, "x"), "x");
    }
}
