//! Process-environment isolation for config tests.

use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Every variable `Config::apply_env_overrides` reads.
const RELAY_VARS: &[&str] = &[
    "DISCORD_TOKEN",
    "MODEL",
    "OLLAMA_HOST",
    "NAME",
    "SYSTEM_PROMPT",
    "COMMAND_PREFIX",
    "CHANNELS",
    "REQUIRES_MENTION",
    "RANDOM_RESPOND",
    "RANDOM_RESPOND_PERCENTAGE",
    "LOG_ALL_MESSAGES",
    "LIMIT_CHANNELS",
    "AUTOMATIC_SAVE",
    "USE_CUSTOM_NAME",
];

/// Exclusive view of the relay's environment variables.
///
/// Starts with all of them unset so the developer's shell cannot leak into
/// a test, and restores the saved values as a set on drop.
pub(super) struct RelayEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl RelayEnv {
    pub(super) fn clean() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = RELAY_VARS
            .iter()
            .map(|&key| (key, std::env::var(key).ok()))
            .collect();
        for key in RELAY_VARS {
            // SAFETY: ENV_LOCK is held until this value drops, and config
            // tests only mutate the environment through `RelayEnv`.
            unsafe {
                std::env::remove_var(key);
            }
        }
        Self { saved, _lock: lock }
    }

    pub(super) fn set(&mut self, key: &str, value: &str) -> &mut Self {
        assert!(RELAY_VARS.contains(&key), "{key} would not be restored");
        // SAFETY: as in `clean`; the lock is owned by `self`.
        unsafe {
            std::env::set_var(key, value);
        }
        self
    }
}

impl Drop for RelayEnv {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            // SAFETY: fields drop after this body, so the lock is still held.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
