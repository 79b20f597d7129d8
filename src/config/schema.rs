use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path the config was read from - not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Rename the bot in every guild on startup.
    #[serde(default = "default_true")]
    pub change_nickname: bool,
    /// Nickname from the persona name instead of the model name.
    #[serde(default)]
    pub use_custom_name: bool,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            change_nickname: true,
            use_custom_name: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model_name() -> String {
    "llama3".into()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_timeout_secs() -> u64 {
    120
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            base_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
}

fn default_persona_name() -> String {
    "assistant".into()
}

impl PersonaConfig {
    /// The prompt as it sits at history index 0.
    pub fn system_entry_text(&self) -> String {
        format!("\n{}\n", self.system_prompt)
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            system_prompt: String::new(),
        }
    }
}

/// Participation rules consumed by the response gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_true")]
    pub requires_mention: bool,
    #[serde(default)]
    pub random_respond: bool,
    /// Chance in percent (0-100) that an unmentioned message is answered.
    #[serde(default)]
    pub random_respond_percentage: u8,
    #[serde(default)]
    pub log_all_messages: bool,
    #[serde(default)]
    pub limit_channels: bool,
    /// Channel ids allowed to trigger a reply when `limit_channels` is set.
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_command_prefix() -> String {
    "!".into()
}

impl GateConfig {
    pub fn is_channel_allowed(&self, channel_id: &str) -> bool {
        self.channels.iter().any(|c| c == channel_id)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            requires_mention: true,
            random_respond: false,
            random_respond_percentage: 0,
            log_all_messages: false,
            limit_channels: false,
            channels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default = "default_backup_slots")]
    pub backup_slots: usize,
    /// Entry cap, system entry included.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_true")]
    pub automatic_save: bool,
}

fn default_state_file() -> PathBuf {
    PathBuf::from("save.json")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_backup_slots() -> usize {
    100
}

fn default_max_size() -> usize {
    55
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            backup_dir: default_backup_dir(),
            backup_slots: default_backup_slots(),
            max_size: default_max_size(),
            automatic_save: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_attachment_chars")]
    pub max_attachment_chars: usize,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

fn default_max_file_size() -> u64 {
    2 * 1024 * 1024
}

fn default_max_attachment_chars() -> usize {
    20_000
}

fn default_max_chunk_size() -> usize {
    2000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_attachment_chars: default_max_attachment_chars(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

fn default_true() -> bool {
    true
}
