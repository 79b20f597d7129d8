//! Turns an inbound message and its attachments into one user entry.

mod header;

use crate::channels::{Attachment, AttachmentReader, InboundMessage};
use crate::config::LimitsConfig;
use crate::error::IngestError;
use crate::history::HistoryEntry;

pub use header::{format_timestamp, render_header};

#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    limits: LimitsConfig,
}

impl IngestionPipeline {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Entry for a message that is recorded but not answered. Attachments
    /// are not downloaded.
    pub fn log_entry(&self, message: &InboundMessage) -> HistoryEntry {
        HistoryEntry::user(render_header(message))
    }

    /// Validate every attachment and build the user entry.
    ///
    /// Stops at the first rejected attachment; nothing is returned for the
    /// message in that case, so the caller has nothing to append.
    pub async fn ingest<R>(
        &self,
        message: &InboundMessage,
        reader: &R,
    ) -> Result<HistoryEntry, IngestError>
    where
        R: AttachmentReader + ?Sized,
    {
        let mut content = render_header(message);
        if message.attachments.is_empty() {
            return Ok(HistoryEntry::user(content));
        }

        let combined = self.combine_attachments(&message.attachments, reader).await?;
        content.push_str("\n\n");
        content.extend(combined.chars().take(self.limits.max_attachment_chars));
        Ok(HistoryEntry::user(content))
    }

    async fn combine_attachments<R>(
        &self,
        attachments: &[Attachment],
        reader: &R,
    ) -> Result<String, IngestError>
    where
        R: AttachmentReader + ?Sized,
    {
        let max_chars = self.limits.max_attachment_chars;
        let mut combined = String::new();
        let mut combined_chars = 0_usize;

        for attachment in attachments {
            let text = self.read_text(attachment, reader).await?;
            let piece = format!("\n\n{}\n{text}\n", attachment.filename);
            combined_chars += piece.chars().count();
            combined.push_str(&piece);

            if combined_chars > max_chars {
                tracing::info!(
                    filename = %attachment.filename,
                    combined_chars,
                    max_chars,
                    "combined attachments over limit"
                );
                return Err(IngestError::AttachmentsTooLarge { max_chars });
            }
        }

        Ok(combined)
    }

    async fn read_text<R>(
        &self,
        attachment: &Attachment,
        reader: &R,
    ) -> Result<String, IngestError>
    where
        R: AttachmentReader + ?Sized,
    {
        let max_bytes = self.limits.max_file_size;
        let too_large = |size: u64| IngestError::AttachmentTooLarge {
            filename: attachment.filename.clone(),
            size,
            max_bytes,
        };

        if attachment.size > max_bytes {
            return Err(too_large(attachment.size));
        }

        let bytes = reader
            .read_attachment(attachment)
            .await
            .map_err(|e| IngestError::AttachmentRead {
                filename: attachment.filename.clone(),
                message: format!("{e:#}"),
            })?;

        // The reported size can be stale; the downloaded length is authoritative.
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if actual > max_bytes {
            return Err(too_large(actual));
        }

        String::from_utf8(bytes).map_err(|_| IngestError::AttachmentNotText {
            filename: attachment.filename.clone(),
        })
    }
}
