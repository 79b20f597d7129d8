use super::types::Command;
use std::str::FromStr;

/// Parse `<prefix><name> [args...]`. The name must follow the prefix
/// directly. Arguments are ignored; unknown names and text without the
/// prefix yield `None`.
pub fn parse_command(input: &str, prefix: &str) -> Option<Command> {
    if prefix.is_empty() {
        return None;
    }
    let rest = input.strip_prefix(prefix)?;
    let name = rest.split(char::is_whitespace).next()?;
    if name.is_empty() {
        return None;
    }
    Command::from_str(name).ok()
}
