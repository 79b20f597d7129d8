use strum::{Display, EnumIter, EnumString};

/// Operator commands, invoked as `<prefix><name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Command {
    Reset,
    Model,
    Char,
    Save,
    Logs,
    System,
    Help,
}

impl Command {
    pub fn description(self) -> &'static str {
        match self {
            Self::Reset => "Back up the saved conversation and start over",
            Self::Model => "Show the model name",
            Self::Char => "Show the character name",
            Self::Save => "Save the conversation now",
            Self::Logs => "Print the conversation log (for debugging)",
            Self::System => "Show the system prompt",
            Self::Help => "List the available commands",
        }
    }
}

/// Reply text for the channel a command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub text: String,
}

impl CommandResult {
    pub fn visible(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
