use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, interval};
use tokio_tungstenite::tungstenite::Message;

use super::types::{DEFAULT_HEARTBEAT_INTERVAL_MS, GatewayOpcode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttachment {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub url: String,
}

/// `MESSAGE_CREATE` fields the relay cares about, before channel names are
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub global_name: Option<String>,
    pub member_nick: Option<String>,
    pub content: String,
    pub timestamp: String,
    pub message_type: u64,
    pub mentions: Vec<String>,
    pub mention_everyone: bool,
    pub attachments: Vec<RawAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready {
        user_id: String,
    },
    GuildCreate {
        guild_id: String,
        name: String,
        /// `(id, name)` for every channel in the guild.
        channels: Vec<(String, String)>,
    },
    ChannelUpsert {
        channel_id: String,
        name: String,
    },
    MessageCreate(Box<RawMessage>),
}

pub struct DiscordGateway {
    bot_token: String,
    intents: u64,
    sequence: AtomicI64,
}

impl DiscordGateway {
    pub fn new(bot_token: String, intents: u64) -> Self {
        Self {
            bot_token,
            intents,
            sequence: AtomicI64::new(-1),
        }
    }

    /// Run one gateway session. Returns `Ok(())` when Discord asks for a
    /// reconnect or the socket closes; the caller's supervisor reconnects.
    pub async fn connect_and_listen(
        &self,
        http: &super::http_client::DiscordHttpClient,
        tx: &tokio::sync::mpsc::Sender<GatewayEvent>,
    ) -> Result<()> {
        let gateway_url = http
            .get_gateway_bot()
            .await
            .context("fetch Discord gateway/bot URL")?
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or("wss://gateway.discord.gg")
            .to_string();
        let ws_url = build_gateway_ws_url(&gateway_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .with_context(|| format!("connect Discord gateway websocket: {ws_url}"))?;
        let (mut write, mut read) = ws_stream.split();

        let heartbeat_interval_ms = read_hello_heartbeat_interval(&mut read).await?;
        self.sequence.store(-1, Ordering::SeqCst);
        self.send_identify(&mut write).await?;
        tracing::info!("Discord gateway connected");

        let mut heartbeat = interval(Duration::from_millis(heartbeat_interval_ms));
        let heartbeat_acked = AtomicBool::new(true);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !heartbeat_acked.load(Ordering::SeqCst) {
                        tracing::warn!("Discord gateway heartbeat ACK missing; reconnecting");
                        return Ok(());
                    }
                    self.send_heartbeat(&mut write).await?;
                    heartbeat_acked.store(false, Ordering::SeqCst);
                }
                message = read.next() => {
                    let Some(message) = message else {
                        tracing::warn!("Discord gateway socket closed; reconnecting");
                        return Ok(());
                    };
                    let message = message.context("read Discord gateway message")?;
                    if !self.handle_gateway_message(message, tx, &mut write, &heartbeat_acked).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn send_identify<WsSink>(&self, write: &mut WsSink) -> Result<()>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let payload = json!({
            "op": GatewayOpcode::Identify as u8,
            "d": {
                "token": self.bot_token,
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "chatrelay",
                    "device": "chatrelay"
                }
            }
        });
        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway identify")
    }

    async fn send_heartbeat<WsSink>(&self, write: &mut WsSink) -> Result<()>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let sequence = self.sequence.load(Ordering::SeqCst);
        let d = if sequence < 0 {
            serde_json::Value::Null
        } else {
            json!(sequence)
        };
        let payload = json!({ "op": GatewayOpcode::Heartbeat as u8, "d": d });
        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway heartbeat")
    }

    async fn handle_gateway_message<WsSink>(
        &self,
        message: Message,
        tx: &tokio::sync::mpsc::Sender<GatewayEvent>,
        write: &mut WsSink,
        heartbeat_acked: &AtomicBool,
    ) -> Result<bool>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let Some(raw) = websocket_message_to_text(message) else {
            return Ok(true);
        };

        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway payload")?;

        if let Some(sequence) = payload.get("s").and_then(serde_json::Value::as_i64) {
            self.sequence.store(sequence, Ordering::SeqCst);
        }

        let op = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        match op {
            Some(GatewayOpcode::Heartbeat) => {
                self.send_heartbeat(write).await?;
                Ok(true)
            }
            Some(GatewayOpcode::HeartbeatAck) => {
                heartbeat_acked.store(true, Ordering::SeqCst);
                Ok(true)
            }
            Some(GatewayOpcode::Reconnect) => {
                tracing::info!("Discord gateway requested reconnect");
                Ok(false)
            }
            Some(GatewayOpcode::InvalidSession) => {
                tracing::warn!("Discord gateway invalid session; reconnecting");
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(false)
            }
            Some(GatewayOpcode::Dispatch) => {
                let event_type = payload
                    .get("t")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("");
                if let Some(event) = payload
                    .get("d")
                    .and_then(|d| parse_dispatch_event(event_type, d))
                {
                    tx.send(event)
                        .await
                        .context("dispatch parsed Discord gateway event")?;
                }
                Ok(true)
            }
            _ => Ok(true),
        }
    }
}

pub fn parse_dispatch_event(event_type: &str, d: &serde_json::Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => Some(GatewayEvent::Ready {
            user_id: d.get("user")?.get("id")?.as_str()?.to_string(),
        }),
        "GUILD_CREATE" => parse_guild_create_event(d),
        "CHANNEL_CREATE" | "CHANNEL_UPDATE" => Some(GatewayEvent::ChannelUpsert {
            channel_id: d.get("id")?.as_str()?.to_string(),
            name: d.get("name")?.as_str()?.to_string(),
        }),
        "MESSAGE_CREATE" => parse_message_create_event(d).map(|m| GatewayEvent::MessageCreate(Box::new(m))),
        _ => None,
    }
}

fn str_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

fn parse_guild_create_event(d: &serde_json::Value) -> Option<GatewayEvent> {
    let guild_id = str_field(d, "id")?;
    let name = str_field(d, "name").unwrap_or_default();
    let channels = d
        .get("channels")
        .and_then(serde_json::Value::as_array)
        .map(|channels| {
            channels
                .iter()
                .filter_map(|channel| Some((str_field(channel, "id")?, str_field(channel, "name")?)))
                .collect()
        })
        .unwrap_or_default();

    Some(GatewayEvent::GuildCreate {
        guild_id,
        name,
        channels,
    })
}

fn parse_message_create_event(d: &serde_json::Value) -> Option<RawMessage> {
    let author = d.get("author")?;
    let mentions = d
        .get("mentions")
        .and_then(serde_json::Value::as_array)
        .map(|users| users.iter().filter_map(|u| str_field(u, "id")).collect())
        .unwrap_or_default();

    Some(RawMessage {
        id: str_field(d, "id")?,
        channel_id: str_field(d, "channel_id")?,
        guild_id: str_field(d, "guild_id"),
        author_id: str_field(author, "id")?,
        username: str_field(author, "username").unwrap_or_default(),
        discriminator: str_field(author, "discriminator"),
        global_name: str_field(author, "global_name"),
        member_nick: d.get("member").and_then(|m| str_field(m, "nick")),
        content: str_field(d, "content").unwrap_or_default(),
        timestamp: str_field(d, "timestamp").unwrap_or_default(),
        message_type: d.get("type").and_then(serde_json::Value::as_u64).unwrap_or(0),
        mentions,
        mention_everyone: d
            .get("mention_everyone")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
        attachments: parse_raw_attachments(d),
    })
}

fn parse_raw_attachments(d: &serde_json::Value) -> Vec<RawAttachment> {
    d.get("attachments")
        .and_then(serde_json::Value::as_array)
        .map(|attachments| {
            attachments
                .iter()
                .filter_map(|attachment| {
                    Some(RawAttachment {
                        id: str_field(attachment, "id").unwrap_or_default(),
                        filename: str_field(attachment, "filename")
                            .unwrap_or_else(|| "attachment".to_string()),
                        size: attachment
                            .get("size")
                            .and_then(serde_json::Value::as_u64)
                            .unwrap_or(0),
                        url: str_field(attachment, "url")?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn read_hello_heartbeat_interval<WsRead>(read: &mut WsRead) -> Result<u64>
where
    WsRead:
        Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let message = message.context("read Discord gateway hello payload")?;
        let Some(raw) = websocket_message_to_text(message) else {
            continue;
        };

        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway hello JSON")?;

        let op = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        if op == Some(GatewayOpcode::Hello) {
            let interval_ms = payload
                .get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS);
            return Ok(interval_ms);
        }
    }

    Err(anyhow::anyhow!("Discord gateway closed before Hello"))
}

fn websocket_message_to_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

fn build_gateway_ws_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    format!("{trimmed}/?v=10&encoding=json")
}
