use crate::channels::{Channel, GuildInfo};
use crate::config::Config;

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn nickname_for(config: &Config) -> String {
    if config.discord.use_custom_name {
        capitalize(&config.persona.name)
    } else {
        capitalize(&config.model.name)
    }
}

/// Best effort; a failure is logged and otherwise ignored.
pub async fn apply_nickname(channel: &dyn Channel, guild: &GuildInfo, config: &Config) {
    if !config.discord.change_nickname {
        return;
    }
    let nickname = nickname_for(config);
    match channel.set_nickname(&guild.id, &nickname).await {
        Ok(()) => tracing::info!(guild = %guild.name, %nickname, "nickname changed"),
        Err(error) => tracing::error!(
            guild = %guild.name,
            error = %format!("{error:#}"),
            "failed to change nickname"
        ),
    }
}
