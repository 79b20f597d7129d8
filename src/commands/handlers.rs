use super::types::{Command, CommandResult};
use crate::config::Config;
use strum::IntoEnumIterator;

/// Replies for commands answered from configuration alone. Commands that
/// read or mutate the conversation return `None` and are handled by the
/// relay under the history lock.
pub fn handle_static(command: Command, config: &Config) -> Option<CommandResult> {
    let text = match command {
        Command::Model => format!("Current model: {}", config.model.name),
        Command::Char => format!("Character: {}", config.persona.name),
        Command::System => format!("SYSTEM :\n {}", config.persona.system_entry_text()),
        Command::Help => help_text(&config.gate.command_prefix),
        Command::Reset | Command::Save | Command::Logs => return None,
    };
    Some(CommandResult::visible(text))
}

pub fn help_text(prefix: &str) -> String {
    let mut text = String::from("Commands:");
    for command in Command::iter() {
        text.push_str(&format!("\n  {prefix}{command} - {}", command.description()));
    }
    text
}
