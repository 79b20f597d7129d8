use super::Config;
use crate::error::ConfigError;
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Defaults, then the TOML file (if present), then environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match explicit_path {
            Some(path) => expand_path(path),
            None => default_config_path()?,
        };

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&contents).map_err(|e| {
                ConfigError::Load(format!("{}: {e}", config_path.display()))
            })?
        } else {
            if explicit_path.is_some() {
                return Err(ConfigError::Load(format!(
                    "config file not found: {}",
                    config_path.display()
                )));
            }
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Self::default()
        };
        config.config_path = config_path;

        config.apply_env_overrides()?;
        config.history.state_file = expand_path(&config.history.state_file);
        config.history.backup_dir = expand_path(&config.history.backup_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate.random_respond_percentage > 100 {
            return Err(ConfigError::Validation(format!(
                "random_respond_percentage must be 0-100, got {}",
                self.gate.random_respond_percentage
            )));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature must be within 0.0-2.0, got {}",
                self.model.temperature
            )));
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Validation("timeout_secs must be > 0".into()));
        }
        if self.history.max_size < 2 {
            return Err(ConfigError::Validation(
                "history max_size must leave room for at least one entry after the system prompt"
                    .into(),
            ));
        }
        if self.history.backup_slots == 0 {
            return Err(ConfigError::Validation("backup_slots must be > 0".into()));
        }
        if self.limits.max_file_size == 0
            || self.limits.max_attachment_chars == 0
            || self.limits.max_chunk_size == 0
        {
            return Err(ConfigError::Validation("size limits must be > 0".into()));
        }
        if self.gate.command_prefix.is_empty() {
            return Err(ConfigError::Validation("command_prefix must not be empty".into()));
        }
        let base_url = url::Url::parse(&self.model.base_url).map_err(|e| {
            ConfigError::Validation(format!("invalid model base_url {}: {e}", self.model.base_url))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "model base_url must be http or https, got {}",
                self.model.base_url
            )));
        }
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .ok_or_else(|| ConfigError::Load("could not find home directory".into()))?;
    Ok(home.join(".chatrelay").join("config.toml"))
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
