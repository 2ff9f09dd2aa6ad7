//! Interactive terminal client for a thread-based chat service.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the service named by $CHATLINE_BASE_URL (or the local default)
//! chatline
//!
//! # Point at a specific service and keep state elsewhere
//! chatline --base-url https://chat.example.com/api/ --state-file ~/.chatline.json
//!
//! # Undo feedback that could not be delivered
//! chatline --rollback-evaluations
//! ```
//!
//! Diagnostics go to stderr; set `CHATLINE_LOG=debug` to see them.
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/new` - Start a new conversation
//! - `/good [id]`, `/bad [id]` - Give feedback on an answer
//! - `/examples`, `/example <n>` - Show or ask example questions
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use chatline::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use chatline::EvaluationOutcome;

/// Main entry point for the chatline application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CHATLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("chatline [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let mut session = ChatSession::from_config(config)?;
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;
    let mut examples: Vec<String> = Vec::new();

    println!("chatline ({})", session.backend().base_url());
    println!("Type /help for commands, /quit to exit\n");

    if let Err(err) = session.start().await {
        renderer.print_error(&format!("Could not sign in: {err}"));
        renderer.print_info("Use /login to try again.");
    } else {
        show_examples(&mut session, &mut renderer, &mut examples).await;
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(trimmed);

                let Some(cmd) = parse_command(trimmed) else {
                    // The length limit counts the line as typed.
                    ask(&mut session, &mut renderer, &line).await;
                    continue;
                };

                match cmd {
                    ChatCommand::Quit => {
                        println!("Goodbye!");
                        break;
                    }
                    ChatCommand::Help => {
                        for line in help_text().lines() {
                            println!("    {line}");
                        }
                    }
                    ChatCommand::New => {
                        session.new_conversation();
                        renderer.print_info("Started a new conversation.");
                        show_examples(&mut session, &mut renderer, &mut examples).await;
                    }
                    ChatCommand::Evaluate(verdict, id) => {
                        let outcome = match id {
                            Some(id) => session.evaluate(id, verdict, &mut renderer).await,
                            None => session.evaluate_latest(verdict, &mut renderer).await,
                        };
                        match outcome {
                            Ok(EvaluationOutcome::Skipped) => {
                                renderer.print_info("Nothing to give feedback on yet.")
                            }
                            Ok(_) => {}
                            Err(err) => renderer.print_error(&err.to_string()),
                        }
                    }
                    ChatCommand::History => {
                        if session.conversation().is_empty() {
                            renderer.print_info("(no messages)");
                        }
                        for message in session.conversation().messages() {
                            renderer.print_message(message);
                        }
                    }
                    ChatCommand::Examples => {
                        show_examples(&mut session, &mut renderer, &mut examples).await;
                    }
                    ChatCommand::Example(n) => match examples.get(n - 1).cloned() {
                        Some(question) => {
                            println!("You: {question}");
                            ask(&mut session, &mut renderer, &question).await;
                        }
                        None => renderer.print_error(&format!("No example number {n}.")),
                    },
                    ChatCommand::Login => match session.start().await {
                        Ok(_) => renderer.print_info("Signed in."),
                        Err(err) => renderer.print_error(&format!("Could not sign in: {err}")),
                    },
                    ChatCommand::Logout => match session.logout() {
                        Ok(()) => renderer.print_info("Signed out."),
                        Err(err) => renderer.print_error(&format!("Could not sign out: {err}")),
                    },
                    ChatCommand::Stats => print_stats(&session),
                    ChatCommand::Invalid(message) => renderer.print_error(&message),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

async fn ask(session: &mut ChatSession, renderer: &mut PlainTextRenderer, question: &str) {
    if let Err(err) = session.send(question, renderer).await {
        renderer.print_error(&err.to_string());
    }
}

async fn show_examples(
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
    examples: &mut Vec<String>,
) {
    let Ok(sample) = session.example_questions(renderer).await else {
        return;
    };
    if sample.is_empty() {
        return;
    }
    renderer.print_info("Try asking (/example <n>):");
    for (i, question) in sample.iter().enumerate() {
        renderer.print_info(&format!("  {}. {question}", i + 1));
    }
    *examples = sample;
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Messages: {}", stats.message_count);
    println!("      Answers: {}", stats.bot_message_count);
    println!("      Answers with feedback: {}", stats.evaluated_count);
    match stats.thread_id {
        Some(ref id) => println!("      Thread: {id}"),
        None => println!("      Thread: (none)"),
    }
    println!(
        "      Session: {}",
        if stats.has_session {
            "signed in"
        } else {
            "signed out"
        }
    );
    println!("      Failed feedback: {:?}", stats.evaluation_policy);
}
