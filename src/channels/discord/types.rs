//! Discord API constants and type definitions.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};

/// Discord API base URL (v10).
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Gateway intents bitmask.
///
/// GUILDS (1) | `GUILD_MESSAGES` (512) | `DIRECT_MESSAGES` (4096)
/// | `MESSAGE_CONTENT` (32768) = 37377
pub const DEFAULT_INTENTS: u64 = 37377;

/// Default heartbeat interval when server does not provide one (ms).
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Discord maximum message length (characters).
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Gateway opcodes used in the Discord WebSocket protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayOpcode {
    /// An event was dispatched (server → client).
    Dispatch = 0,
    /// Fired periodically to keep the connection alive.
    Heartbeat = 1,
    /// Starts a new session during the initial handshake.
    Identify = 2,
    /// Server is telling the client to reconnect.
    Reconnect = 7,
    /// The session has been invalidated.
    InvalidSession = 9,
    /// Sent immediately after connecting; contains heartbeat interval.
    Hello = 10,
    /// Acknowledges a received heartbeat.
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    /// Convert a raw u64 value to an opcode, if handled.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            7 => Some(Self::Reconnect),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }
}

/// Message types that carry user-authored content. Everything else (joins,
/// pins, boosts, ...) is a platform system message.
pub fn is_user_message_type(message_type: u64) -> bool {
    // DEFAULT, REPLY, CHAT_INPUT_COMMAND, THREAD_STARTER_MESSAGE, CONTEXT_MENU_COMMAND
    matches!(message_type, 0 | 19 | 20 | 21 | 23)
}

/// The bot's user id is the base64 encoded first segment of its token.
pub fn bot_user_id_from_token(token: &str) -> Option<String> {
    let part = token.split('.').next()?.trim_end_matches('=');
    let bytes = STANDARD_NO_PAD
        .decode(part)
        .or_else(|_| URL_SAFE_NO_PAD.decode(part))
        .ok()?;
    String::from_utf8(bytes).ok()
}
