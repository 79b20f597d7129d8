use std::path::PathBuf;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the relay.
///
/// Each subsystem defines its own error enum. The relay matches on these to
/// decide whether a failure becomes a channel notice, a reply text, or a log
/// line; collaborator edges keep using `anyhow::Result` for context chains.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── History / persistence ───────────────────────────────────────────
    #[error("history: {0}")]
    History(#[from] HistoryError),

    // ── Attachment ingestion ────────────────────────────────────────────
    #[error("ingest: {0}")]
    Ingest(#[from] IngestError),

    // ── Model inference ─────────────────────────────────────────────────
    #[error("inference: {0}")]
    Inference(#[from] InferenceError),

    // ── Transport / Channel ─────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── History errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum HistoryError {
    /// Only ever logged: a failed load falls back to a fresh history.
    #[error("failed to load state from {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("failed to save state to {path}: {message}")]
    Save { path: PathBuf, message: String },

    #[error("backup rotation failed at slot {slot}: {message}")]
    BackupRotation { slot: usize, message: String },

    #[error("the file {} does not exist", path.display())]
    NothingToReset { path: PathBuf },
}

impl HistoryError {
    pub fn user_message(&self) -> String {
        match self {
            Self::NothingToReset { path } => format!("The file {} does not exist.", path.display()),
            Self::Save { message, .. } => format!("Failed to save the conversation: {message}"),
            Self::BackupRotation { message, .. } => {
                format!("Reset aborted, backups could not be rotated: {message}")
            }
            Self::Load { message, .. } => format!("Failed to load the conversation: {message}"),
        }
    }
}

// ─── Ingestion errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("attachment {filename} is {size} bytes, limit is {max_bytes}")]
    AttachmentTooLarge {
        filename: String,
        size: u64,
        max_bytes: u64,
    },

    #[error("attachment {filename} is not valid UTF-8 text")]
    AttachmentNotText { filename: String },

    #[error("combined attachments exceed {max_chars} characters")]
    AttachmentsTooLarge { max_chars: usize },

    #[error("failed to read attachment {filename}: {message}")]
    AttachmentRead { filename: String, message: String },
}

impl IngestError {
    /// Notice posted back into the originating channel.
    #[allow(clippy::cast_precision_loss)]
    pub fn user_message(&self) -> String {
        match self {
            Self::AttachmentTooLarge {
                filename,
                max_bytes,
                ..
            } => format!(
                "The file {filename} is too large. Please send files smaller than {:.1} MB.",
                *max_bytes as f64 / (1024.0 * 1024.0)
            ),
            Self::AttachmentNotText { filename } => {
                format!("The file {filename} is not a valid text file.")
            }
            Self::AttachmentsTooLarge { max_chars } => format!(
                "The combined files are too large. Please send text files with a combined size of less than {max_chars} characters."
            ),
            Self::AttachmentRead { filename, .. } => {
                format!("The file {filename} could not be downloaded.")
            }
        }
    }
}

// ─── Inference errors ───────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference timed out")]
    Timeout,

    #[error("backend error: {0}")]
    Backend(String),
}

impl InferenceError {
    /// Text that stands in for the assistant's reply when inference fails.
    pub fn reply_text(&self) -> String {
        match self {
            Self::Timeout => "The request timed out. Please try again.".to_string(),
            Self::Backend(message) => format!("An error occurred: {message}"),
        }
    }
}

// ─── Transport errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("channel {channel} connection failed: {message}")]
    Connection { channel: String, message: String },

    #[error("channel {channel} send failed: {message}")]
    Send { channel: String, message: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, RelayError>;
