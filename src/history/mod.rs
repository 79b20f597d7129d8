pub mod backup;
pub mod store;
pub mod types;

pub use backup::{BackupSet, SlotMove};
pub use store::HistoryStore;
pub use types::{ConversationHistory, HistoryEntry, Role};
