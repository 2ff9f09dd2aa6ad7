//! Slash command parsing for the chat client.
//!
//! Input starting with `/` controls the client and is never sent as a
//! question.

use crate::types::{MessageId, Verdict};

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat client.
    Quit,

    /// Start a new conversation on a new thread.
    New,

    /// Give feedback.  `None` targets the latest bot answer.
    Evaluate(Verdict, Option<MessageId>),

    /// Print the conversation so far.
    History,

    /// Show a sample of example questions.
    Examples,

    /// Ask example question number `n` (1-based) from the last listing.
    Example(usize),

    /// Obtain or revalidate the session token.
    Login,

    /// Forget the session token.
    Logout,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be asked as a question.
///
/// # Examples
///
/// ```
/// # use chatline::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/good 42").is_some());
/// assert!(parse_command("What is a thread?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "new" | "clear" => ChatCommand::New,
        "good" | "up" => parse_evaluate(Verdict::Positive, argument, "/good"),
        "bad" | "down" => parse_evaluate(Verdict::Negative, argument, "/bad"),
        "history" => ChatCommand::History,
        "examples" => ChatCommand::Examples,
        "example" => match argument.map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => ChatCommand::Example(n),
            Some(_) => ChatCommand::Invalid("/example expects a positive number".to_string()),
            None => ChatCommand::Invalid("/example requires a number".to_string()),
        },
        "login" => ChatCommand::Login,
        "logout" => ChatCommand::Logout,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_evaluate(verdict: Verdict, argument: Option<&str>, name: &str) -> ChatCommand {
    match argument {
        Some(arg) => match arg.parse::<MessageId>() {
            Ok(id) => ChatCommand::Evaluate(verdict, Some(id)),
            Err(_) => ChatCommand::Invalid(format!("{name} expects a message id")),
        },
        None => ChatCommand::Evaluate(verdict, None),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new conversation
  /good [id]             Mark an answer as helpful (default: the latest)
  /bad [id]              Mark an answer as unhelpful (default: the latest)
  /history               Show the conversation with message ids
  /examples              Show example questions
  /example <n>           Ask example question n
  /login                 Sign in again
  /logout                Forget the session token
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
