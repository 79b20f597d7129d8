use super::backup::BackupSet;
use super::types::{ConversationHistory, HistoryEntry};
use crate::config::HistoryConfig;
use crate::error::HistoryError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable home of the shared conversation: one JSON state file plus a
/// rotating set of numbered backups.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    state_file: PathBuf,
    backups: BackupSet,
    system_prompt: String,
}

impl HistoryStore {
    pub fn new(state_file: impl Into<PathBuf>, backups: BackupSet, system_prompt: String) -> Self {
        Self {
            state_file: state_file.into(),
            backups,
            system_prompt,
        }
    }

    pub fn from_config(config: &HistoryConfig, system_prompt: String) -> Self {
        Self::new(
            config.state_file.clone(),
            BackupSet::new(config.backup_dir.clone(), config.backup_slots),
            system_prompt,
        )
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn backups(&self) -> &BackupSet {
        &self.backups
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn fresh(&self) -> ConversationHistory {
        ConversationHistory::new(&self.system_prompt)
    }

    /// Load the persisted history, falling back to a fresh one on any failure.
    pub fn load(&self) -> ConversationHistory {
        match self.try_load() {
            Ok(history) => {
                tracing::info!(
                    path = %self.state_file.display(),
                    entries = history.len(),
                    "conversation history loaded"
                );
                history
            }
            Err(error) => {
                tracing::warn!(%error, "starting with a fresh conversation history");
                self.fresh()
            }
        }
    }

    fn try_load(&self) -> Result<ConversationHistory, HistoryError> {
        let load_error = |message: String| HistoryError::Load {
            path: self.state_file.clone(),
            message,
        };

        let raw = fs::read_to_string(&self.state_file).map_err(|e| load_error(e.to_string()))?;
        let entries: Vec<HistoryEntry> =
            serde_json::from_str(&raw).map_err(|e| load_error(e.to_string()))?;
        ConversationHistory::from_persisted(entries, &self.system_prompt)
            .ok_or_else(|| load_error("state file holds no entries".into()))
    }

    /// Replace the state file with `history`.
    ///
    /// Writes a sibling temp file, syncs it, then renames it over the target
    /// so a concurrent reader sees either the old or the new file.
    pub fn save(&self, history: &ConversationHistory) -> Result<(), HistoryError> {
        let save_error = |message: String| HistoryError::Save {
            path: self.state_file.clone(),
            message,
        };

        let json = serde_json::to_vec(history).map_err(|e| save_error(e.to_string()))?;

        if let Some(parent) = self.state_file.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| save_error(format!("create {}: {e}", parent.display())))?;
        }

        let temp_path = self.state_file.with_extension("json.tmp");
        {
            let mut file = File::create(&temp_path)
                .map_err(|e| save_error(format!("create {}: {e}", temp_path.display())))?;
            file.write_all(&json)
                .and_then(|()| file.sync_all())
                .map_err(|e| save_error(format!("write {}: {e}", temp_path.display())))?;
        }

        if let Err(rename_error) = fs::rename(&temp_path, &self.state_file) {
            let _ = fs::remove_file(&temp_path);
            return Err(save_error(format!("replace: {rename_error}")));
        }

        tracing::debug!(
            path = %self.state_file.display(),
            entries = history.len(),
            "conversation history saved"
        );
        Ok(())
    }

    /// Back up the state file, remove it, and clear `history` to the system entry.
    ///
    /// Fails with `NothingToReset` when no state file exists, and leaves
    /// `history` untouched if backup rotation fails.
    pub fn reset(&self, history: &mut ConversationHistory) -> Result<(), HistoryError> {
        if !self.state_file.is_file() {
            return Err(HistoryError::NothingToReset {
                path: self.state_file.clone(),
            });
        }

        self.backups.rotate_in(&self.state_file)?;

        if let Err(error) = fs::remove_file(&self.state_file) {
            tracing::warn!(
                path = %self.state_file.display(),
                %error,
                "backup written but state file could not be removed"
            );
        }

        history.reset(&self.system_prompt);
        tracing::info!(
            backups = self.backups.occupied_slots().len(),
            "conversation context reset"
        );
        Ok(())
    }
}
