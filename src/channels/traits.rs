use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// File attached to an inbound message; bytes are fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    /// Size reported by the platform, checked before download.
    pub size: u64,
    pub url: String,
}

/// A message delivered by the platform.
///
/// `author_name` is the account identifier (e.g. Discord username) and
/// `display_name` the per-guild name shown in the client.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub display_name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub guild_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// User ids mentioned in the message.
    pub mentions: Vec<String>,
    /// `@everyone` / `@here` was used.
    pub mention_everyone: bool,
    pub is_system: bool,
}

impl InboundMessage {
    /// Direct mention of `user_id`, or a mass mention that reaches everyone.
    pub fn mentions_user(&self, user_id: &str) -> bool {
        self.mention_everyone || self.mentions.iter().any(|m| m == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
}

/// Everything a listener forwards to the relay.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Message(InboundMessage),
    /// A guild became available; used for the nickname routine.
    GuildAvailable(GuildInfo),
}

/// Outbound text, optionally reply-linked to an earlier message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel_id: String,
    pub content: String,
    pub reply_to: Option<String>,
}

/// Fetches attachment bytes; split out so ingestion can be driven without a
/// full platform connection.
pub trait AttachmentReader: Send + Sync {
    fn read_attachment<'a>(
        &'a self,
        attachment: &'a Attachment,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>> + Send + 'a>>;
}

/// Core channel trait — implement for any messaging platform
pub trait Channel: AttachmentReader {
    /// Human-readable channel name
    fn name(&self) -> &str;

    /// The bot's own user id, empty until known.
    fn self_id(&self) -> String;

    /// Send one message through this channel
    fn send<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Start listening for incoming events (long-running)
    fn listen<'a>(
        &'a self,
        tx: tokio::sync::mpsc::Sender<ChannelEvent>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    fn max_message_length(&self) -> usize {
        usize::MAX
    }

    fn send_typing<'a>(
        &'a self,
        _channel_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move { Ok(()) })
    }

    fn set_nickname<'a>(
        &'a self,
        _guild_id: &'a str,
        _nickname: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move { anyhow::bail!("nicknames not supported by this channel") })
    }

    /// Send `text` in order as chunks of at most `max_chars`, reply-linking
    /// only the first one. Returns how many chunks went out.
    fn send_chunked<'a>(
        &'a self,
        text: &'a str,
        channel_id: &'a str,
        reply_to: Option<&'a str>,
        max_chars: usize,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<usize>> + Send + 'a>> {
        Box::pin(async move {
            let limit = max_chars.min(self.max_message_length());
            let plan = super::chunker::DeliveryPlan::new(text, limit, reply_to);
            let mut sent = 0;
            for chunk in &plan {
                self.send(&chunk.to_outbound(channel_id)).await?;
                sent += 1;
            }
            Ok(sent)
        })
    }
}
