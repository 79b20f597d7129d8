use super::Config;
use crate::error::ConfigError;

impl Config {
    /// Overlay the process environment using the relay's variable names.
    ///
    /// Flags are parsed into `bool` once here; an unrecognized value is a
    /// startup error rather than a silent `false`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(token) = non_empty_var("DISCORD_TOKEN") {
            self.discord.bot_token = token;
        }
        if let Some(model) = non_empty_var("MODEL") {
            self.model.name = model;
        }
        if let Some(host) = non_empty_var("OLLAMA_HOST") {
            self.model.base_url = base_url_from_host(&host);
        }
        if let Some(name) = non_empty_var("NAME") {
            self.persona.name = name;
        }
        if let Some(prompt) = non_empty_var("SYSTEM_PROMPT") {
            self.persona.system_prompt = prompt;
        }
        if let Some(prefix) = non_empty_var("COMMAND_PREFIX") {
            self.gate.command_prefix = prefix;
        }
        if let Some(channels) = non_empty_var("CHANNELS") {
            self.gate.channels = parse_channel_list(&channels);
        }

        override_flag("REQUIRES_MENTION", &mut self.gate.requires_mention)?;
        override_flag("RANDOM_RESPOND", &mut self.gate.random_respond)?;
        override_flag("LOG_ALL_MESSAGES", &mut self.gate.log_all_messages)?;
        override_flag("LIMIT_CHANNELS", &mut self.gate.limit_channels)?;
        override_flag("AUTOMATIC_SAVE", &mut self.history.automatic_save)?;
        override_flag("USE_CUSTOM_NAME", &mut self.discord.use_custom_name)?;

        if let Some(raw) = non_empty_var("RANDOM_RESPOND_PERCENTAGE") {
            self.gate.random_respond_percentage = raw.trim().parse::<u8>().map_err(|_| {
                ConfigError::Validation(format!(
                    "RANDOM_RESPOND_PERCENTAGE must be an integer 0-100, got {raw:?}"
                ))
            })?;
        }

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn override_flag(key: &str, target: &mut bool) -> Result<(), ConfigError> {
    if let Some(raw) = non_empty_var(key) {
        *target = parse_flag(&raw).ok_or_else(|| {
            ConfigError::Validation(format!("{key} must be a boolean, got {raw:?}"))
        })?;
    }
    Ok(())
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `OLLAMA_HOST` is usually a bare `host:port`; give it the `http://`
/// scheme the Ollama client assumes.
fn base_url_from_host(raw: &str) -> String {
    let host = raw.trim();
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

fn parse_channel_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}
