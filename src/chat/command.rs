//! Chat input parsing.
//!
//! Lines starting with `/` are commands; everything else is a question.

/// Parsed chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A question for the assistant.
    Question(String),
    /// Show the transcript, newest first.
    History,
    /// Forget the conversation.
    Clear,
    /// Show the reflected table.
    Schema,
    /// Show help message.
    Help,
    /// Leave the chat.
    Quit,
    /// Unrecognized `/` command.
    Unknown(String),
    /// Blank input.
    Empty,
}

impl Command {
    /// Parses one line of user input.
    pub fn parse(input: &str) -> Command {
        let input = input.trim();

        if input.is_empty() {
            return Command::Empty;
        }

        if !input.starts_with('/') {
            return Command::Question(input.to_string());
        }

        let command = input
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match command.as_str() {
            "/history" => Command::History,
            "/clear" => Command::Clear,
            "/schema" => Command::Schema,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Unknown(command),
        }
    }
}

/// Help text listing the chat commands.
pub const HELP_TEXT: &str = "\
Ask a question about your data in plain language.

Commands:
  /history   Show the conversation, newest first
  /clear     Start a new conversation
  /schema    Show the columns the assistant can query
  /help      Show this help
  /quit      Leave (also /exit or Ctrl-D)";
