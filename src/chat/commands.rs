//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the client and is never sent to the endpoint.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Forget the API key and return to the key prompt.
    ClearKey,

    /// Print the conversation so far.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `None` when the input is an ordinary message.
///
/// ```
/// # use palaver::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => no_argument(ChatCommand::Clear, "/clear", argument),
        "key" | "logout" => no_argument(ChatCommand::ClearKey, "/key", argument),
        "history" => no_argument(ChatCommand::History, "/history", argument),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "" => ChatCommand::Invalid("Empty command; try /help".to_string()),
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn no_argument(command: ChatCommand, name: &str, argument: Option<&str>) -> ChatCommand {
    match argument {
        None => command,
        Some(_) => ChatCommand::Invalid(format!("{name} takes no arguments")),
    }
}

/// Returns the help text listing available commands.
pub fn help_text() -> &'static str {
    "\
Commands:
  /clear      Clear the conversation history
  /key        Forget the API key and enter a new one
  /history    Show the conversation so far
  /help       Show this help
  /quit       Exit (also /exit, /q)"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
        assert_eq!(
            parse_command("/clear everything"),
            Some(ChatCommand::Invalid("/clear takes no arguments".to_string()))
        );
    }

    #[test]
    fn parse_key() {
        assert_eq!(parse_command("/key"), Some(ChatCommand::ClearKey));
        assert_eq!(parse_command("/logout"), Some(ChatCommand::ClearKey));
    }

    #[test]
    fn parse_history_and_help() {
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn plain_messages_are_not_commands() {
        assert_eq!(parse_command("Hello"), None);
        assert_eq!(parse_command("what does a/b mean"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(
            parse_command("/model gpt"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
        assert_eq!(
            parse_command("/"),
            Some(ChatCommand::Invalid("Empty command; try /help".to_string()))
        );
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for name in ["/clear", "/key", "/history", "/help", "/quit"] {
            assert!(help.contains(name), "help is missing {name}");
        }
    }
}
