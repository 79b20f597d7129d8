pub mod chunker;
pub mod discord;
pub mod traits;

pub use chunker::{DeliveryChunk, DeliveryPlan, chunk_message};
pub use discord::DiscordChannel;
pub use traits::{
    Attachment, AttachmentReader, Channel, ChannelEvent, GuildInfo, InboundMessage,
    OutboundMessage,
};
