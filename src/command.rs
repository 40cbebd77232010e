//! Client input commands
//!
//! Local input is matched trimmed and case-insensitively against the
//! command sets; anything else non-blank is chat text and is sent exactly
//! as typed.

/// Inputs that end the client
pub const QUIT_COMMANDS: [&str; 4] = ["--exit", "--salir", "--quit", "--q"];

/// Inputs that print usage locally
pub const HELP_COMMANDS: [&str; 3] = ["--ayuda", "--help", "--h"];

/// Usage text printed for a help command
pub const HELP_TEXT: &str = "To leave the client type --exit, --salir, --quit or --q";

/// One line of local input, classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Close the connection and stop
    Quit,
    /// Show usage, send nothing
    Help,
    /// Blank line, ignored
    Empty,
    /// Chat text, borrowed verbatim from the input
    Chat(&'a str),
}

impl<'a> Command<'a> {
    /// Classify a line of input
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }

        let normalized = trimmed.to_lowercase();
        if QUIT_COMMANDS.contains(&normalized.as_str()) {
            Command::Quit
        } else if HELP_COMMANDS.contains(&normalized.as_str()) {
            Command::Help
        } else {
            Command::Chat(line)
        }
    }
}
