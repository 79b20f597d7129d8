use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of the shared conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation log whose first entry is always the system prompt.
///
/// Serialized as a bare list of `{role, content}` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
}

impl ConversationHistory {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            entries: vec![HistoryEntry::system(system_prompt)],
        }
    }

    /// Rebuild from persisted records, forcing index 0 to the current prompt.
    ///
    /// Returns `None` for an empty record list, which has no slot to replace.
    pub fn from_persisted(entries: Vec<HistoryEntry>, system_prompt: &str) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        let mut history = Self { entries };
        history.replace_system_entry(system_prompt);
        Some(history)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true: the system entry is always present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn system(&self) -> &HistoryEntry {
        &self.entries[0]
    }

    pub fn replace_system_entry(&mut self, system_prompt: &str) {
        self.entries[0] = HistoryEntry::system(system_prompt);
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Evict the oldest non-system entries until `len() <= max_size`.
    ///
    /// Returns how many entries were dropped. A `max_size` below 1 still
    /// keeps the system entry.
    pub fn trim(&mut self, max_size: usize) -> usize {
        let limit = max_size.max(1);
        if self.entries.len() <= limit {
            return 0;
        }
        let excess = self.entries.len() - limit;
        self.entries.drain(1..=excess);
        excess
    }

    pub fn reset(&mut self, system_prompt: &str) {
        self.entries.clear();
        self.entries.push(HistoryEntry::system(system_prompt));
    }

    /// Debug rendering used by the `logs` command.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("[{}] {}", entry.role, entry.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
