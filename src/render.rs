//! Output rendering for the chat client.
//!
//! The session reports every state change to a [`Renderer`]: the full transcript after
//! each mutation, and the individual fragments as they stream in.  A terminal
//! renderer only needs the fragments; a full-screen one can redraw from the
//! transcript instead.

use std::io::{self, Stdout, Write};

use crate::types::{Message, MessageRole, Transcript};

/// ANSI escape code for dim text (used for the waiting indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for role labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Returns the cursor to column zero and erases the line.
const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";

const THINKING: &str = "Thinking...";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording for tests
pub trait Renderer: Send {
    /// Called after every change to the transcript, with the complete new state.
    fn transcript_changed(&mut self, transcript: &Transcript) {
        _ = transcript;
    }

    /// Called once the request for a turn is about to be issued.
    fn start_response(&mut self) {}

    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments arrive from the endpoint.
    fn print_text(&mut self, text: &str);

    /// Print a complete message, as when replaying a saved transcript.
    fn print_message(&mut self, message: &Message);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self);
}

/// Replays `transcript` through `renderer`, or a greeting when it is empty.
pub fn render_transcript(renderer: &mut dyn Renderer, transcript: &Transcript) {
    if transcript.is_empty() {
        renderer.print_info("Start a conversation");
        renderer.print_info("Type a message below to get started");
        return;
    }
    for message in transcript {
        renderer.print_message(message);
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// This renderer outputs text directly to stdout.  While the reply being streamed is
/// still empty it shows a "Thinking..." indicator, dimmed when color is enabled.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    waiting: bool,
    line_start: bool,
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
            waiting: false,
            line_start: true,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        print!("{text}");
        self.line_start = text.ends_with('\n');
        self.flush();
    }

    fn clear_waiting(&mut self) {
        if self.waiting {
            if self.use_color {
                print!("{ANSI_CLEAR_LINE}");
            } else {
                print!("\r{}\r", " ".repeat(THINKING.len()));
            }
            self.waiting = false;
            self.line_start = true;
        }
    }

    fn show_waiting(&mut self) {
        if self.waiting {
            return;
        }
        let indicator = if self.use_color {
            format!("{ANSI_DIM}{THINKING}{ANSI_RESET}")
        } else {
            THINKING.to_string()
        };
        self.write(&indicator);
        self.waiting = true;
    }

    fn end_line(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }

    fn label(&self, role: MessageRole) -> String {
        let label = role.label();
        if !self.use_color {
            return format!("{label}:\n");
        }
        match role {
            MessageRole::User => format!("{ANSI_BOLD}{label}:{ANSI_RESET}\n"),
            MessageRole::Assistant => format!("{ANSI_BOLD}{ANSI_CYAN}{label}:{ANSI_RESET}\n"),
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the transcript ends with a reply that has received no text yet.
fn awaiting_reply(transcript: &Transcript) -> bool {
    transcript.last().is_some_and(Message::is_placeholder)
}

impl Renderer for PlainTextRenderer {
    fn transcript_changed(&mut self, transcript: &Transcript) {
        if awaiting_reply(transcript) {
            self.show_waiting();
        } else {
            self.clear_waiting();
        }
    }

    fn start_response(&mut self) {
        self.end_line();
        let label = self.label(MessageRole::Assistant);
        self.write(&label);
    }

    fn print_text(&mut self, text: &str) {
        self.clear_waiting();
        self.write(text);
    }

    fn print_message(&mut self, message: &Message) {
        self.end_line();
        let label = self.label(message.role);
        self.write(&label);
        self.write(&message.content);
        self.end_line();
        self.write("\n");
    }

    fn print_error(&mut self, error: &str) {
        self.clear_waiting();
        self.end_line();
        if self.use_color {
            println!("{ANSI_RED}{error}{ANSI_RESET}");
        } else {
            println!("{error}");
        }
        self.line_start = true;
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.clear_waiting();
        self.end_line();
        println!("{info}");
        self.line_start = true;
        self.flush();
    }

    fn finish_response(&mut self) {
        self.clear_waiting();
        self.end_line();
        self.write("\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lines(Vec<String>);

    impl Renderer for Lines {
        fn print_text(&mut self, text: &str) {
            self.0.push(format!("text:{text}"));
        }

        fn print_message(&mut self, message: &Message) {
            self.0
                .push(format!("{}:{}", message.role.label(), message.content));
        }

        fn print_error(&mut self, error: &str) {
            self.0.push(format!("error:{error}"));
        }

        fn print_info(&mut self, info: &str) {
            self.0.push(format!("info:{info}"));
        }

        fn finish_response(&mut self) {}
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color_labels_plainly() {
        let renderer = PlainTextRenderer::with_color(false);
        assert_eq!(renderer.label(MessageRole::User), "You:\n");
        assert_eq!(renderer.label(MessageRole::Assistant), "Assistant:\n");
    }

    #[test]
    fn waiting_follows_placeholder_with_and_without_color() {
        for use_color in [true, false] {
            let mut renderer = PlainTextRenderer::with_color(use_color);
            let mut transcript = Transcript::from(vec![Message::user("Hello")]);
            renderer.transcript_changed(&transcript);
            assert!(!renderer.waiting);

            transcript.push(Message::placeholder());
            renderer.transcript_changed(&transcript);
            assert!(renderer.waiting, "use_color={use_color}");

            transcript.replace_last_assistant("Hi");
            renderer.transcript_changed(&transcript);
            assert!(!renderer.waiting, "use_color={use_color}");
        }
    }

    #[test]
    fn empty_transcript_shows_greeting() {
        let mut lines = Lines::default();
        render_transcript(&mut lines, &Transcript::new());
        assert_eq!(
            lines.0,
            vec![
                "info:Start a conversation",
                "info:Type a message below to get started"
            ]
        );
    }

    #[test]
    fn transcript_replays_in_order() {
        let mut lines = Lines::default();
        let transcript = Transcript::from(vec![Message::user("Hello"), Message::assistant("Hi")]);
        render_transcript(&mut lines, &transcript);
        assert_eq!(lines.0, vec!["You:Hello", "Assistant:Hi"]);
    }
}
