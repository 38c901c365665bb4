//! Interactive terminal chat against a streaming chat endpoint.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the endpoint on localhost:5050
//! palaver-chat
//!
//! # Pick the endpoint explicitly (or set PALAVER_API_URL)
//! palaver-chat --base-url https://chat.example.com
//!
//! # Keep state somewhere else and disable colors
//! palaver-chat --data-dir ./state --no-color
//! ```
//!
//! The first run asks for an API key; it is saved alongside the conversation and
//! reused until `/key` is entered.
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/key` - Forget the API key
//! - `/history` - Show the conversation so far
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{ColorMode, Editor};
use tracing_subscriber::EnvFilter;

use palaver::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, SecretMask, help_text,
    parse_command, render_transcript,
};
use palaver::{ChatClient, ChatSession, ChatTransport, FileStore, KeyValueStore, TurnOutcome};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PALAVER_LOG";

type LineEditor = Editor<SecretMask, DefaultHistory>;

/// Main entry point for the palaver-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("palaver-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = ChatClient::new(&config.base_url)?;
    println!("Chat (endpoint: {})", client.endpoint());
    let store = FileStore::open(&config.data_dir)?;
    let mut session = ChatSession::open(client, store)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = LineEditor::new()?;
    rl.set_helper(Some(SecretMask::new()));
    // The mask is drawn by the highlighter, which only runs when color output is on.
    rl.set_color_mode(ColorMode::Forced);

    if session.has_credential() {
        println!("Type /help for commands, /quit to exit\n");
        render_transcript(&mut renderer, session.transcript());
    }

    loop {
        if !session.has_credential() {
            if !unlock(&mut rl, &mut session, &mut renderer)? {
                println!("\nGoodbye!");
                break;
            }
            println!("Type /help for commands, /quit to exit\n");
            render_transcript(&mut renderer, session.transcript());
        }

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => match session.clear_transcript() {
                            Ok(()) => renderer.print_info("Conversation cleared."),
                            Err(err) => renderer
                                .print_error(&format!("Failed to clear conversation: {}", err)),
                        },
                        ChatCommand::ClearKey => match session.clear_credential() {
                            Ok(()) => renderer.print_info("API key removed."),
                            Err(err) => {
                                renderer.print_error(&format!("Failed to remove API key: {}", err))
                            }
                        },
                        ChatCommand::History => {
                            render_transcript(&mut renderer, session.transcript());
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                match session.submit(line, &mut renderer).await {
                    TurnOutcome::Completed | TurnOutcome::Failed(_) => {}
                    TurnOutcome::Skipped(reason) => {
                        renderer.print_info(&format!("Message not sent: {reason:?}"));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Prompts until a usable API key is entered.  Returns false if input ends first.
fn unlock<T: ChatTransport, S: KeyValueStore>(
    rl: &mut LineEditor,
    session: &mut ChatSession<T, S>,
    renderer: &mut dyn Renderer,
) -> Result<bool, Box<dyn std::error::Error>> {
    renderer.print_info("Enter API Key");
    renderer.print_info("Please enter your API key to start chatting");
    loop {
        match read_secret(rl, "API key: ") {
            Ok(line) => {
                if session.set_credential(&line)? {
                    return Ok(true);
                }
                renderer.print_error("The API key cannot be empty.");
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => return Ok(false),
            Err(err) => return Err(err.into()),
        }
    }
}

/// Reads one line with the typed characters masked.
fn read_secret(rl: &mut LineEditor, prompt: &str) -> rustyline::Result<String> {
    if let Some(helper) = rl.helper_mut() {
        helper.set_masking(true);
    }
    let line = rl.readline(prompt);
    if let Some(helper) = rl.helper_mut() {
        helper.set_masking(false);
    }
    line
}
