use crate::channels::InboundMessage;
use chrono::{DateTime, Utc};

const HEADER_LEGEND: &str = "Display Name (Username) in Channel - Timestamp";

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
}

/// Attribution block plus message text, as stored in a user entry.
pub fn render_header(message: &InboundMessage) -> String {
    format!(
        "{HEADER_LEGEND}\n{} ({}) in {} - {} \n{}",
        message.display_name,
        message.author_name,
        message.channel_name,
        format_timestamp(&message.timestamp),
        message.content
    )
}
