pub mod gateway;
pub mod http_client;
pub mod types;

use crate::channels::traits::{
    Attachment, AttachmentReader, Channel, ChannelEvent, GuildInfo, InboundMessage,
    OutboundMessage,
};
use crate::config::DiscordConfig;
use crate::error::TransportError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use self::gateway::{DiscordGateway, GatewayEvent, RawMessage};
use self::http_client::DiscordHttpClient;
use self::types::{DEFAULT_INTENTS, MAX_MESSAGE_LENGTH, bot_user_id_from_token, is_user_message_type};

pub struct DiscordChannel {
    http: DiscordHttpClient,
    bot_token: String,
    bot_user_id: RwLock<String>,
    channel_names: RwLock<HashMap<String, String>>,
}

impl DiscordChannel {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            http: DiscordHttpClient::new(&config.bot_token),
            bot_token: config.bot_token.clone(),
            bot_user_id: RwLock::new(bot_user_id_from_token(&config.bot_token).unwrap_or_default()),
            channel_names: RwLock::new(HashMap::new()),
        }
    }

    fn remember_channel(&self, channel_id: String, name: String) {
        self.channel_names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel_id, name);
    }

    fn channel_name(&self, raw: &RawMessage) -> String {
        let names = self
            .channel_names
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match (names.get(&raw.channel_id), &raw.guild_id) {
            (Some(name), _) => name.clone(),
            (None, None) => format!("Direct Message with {}", account_name(raw)),
            (None, Some(_)) => raw.channel_id.clone(),
        }
    }

    /// Returns `false` once the receiving side has gone away.
    async fn handle_gateway_event(
        &self,
        event: GatewayEvent,
        tx: &tokio::sync::mpsc::Sender<ChannelEvent>,
    ) -> bool {
        let forwarded = match event {
            GatewayEvent::Ready { user_id } => {
                tracing::info!(user_id = %user_id, "Discord session ready");
                *self
                    .bot_user_id
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = user_id;
                return true;
            }
            GatewayEvent::ChannelUpsert { channel_id, name } => {
                self.remember_channel(channel_id, name);
                return true;
            }
            GatewayEvent::GuildCreate {
                guild_id,
                name,
                channels,
            } => {
                for (channel_id, channel_name) in channels {
                    self.remember_channel(channel_id, channel_name);
                }
                ChannelEvent::GuildAvailable(GuildInfo { id: guild_id, name })
            }
            GatewayEvent::MessageCreate(raw) => {
                let channel_name = self.channel_name(&raw);
                ChannelEvent::Message(to_inbound(*raw, channel_name))
            }
        };
        tx.send(forwarded).await.is_ok()
    }
}

/// `name#1234` for legacy accounts, the bare username otherwise.
fn account_name(raw: &RawMessage) -> String {
    match raw.discriminator.as_deref() {
        Some(discriminator) if !discriminator.is_empty() && discriminator != "0" => {
            format!("{}#{discriminator}", raw.username)
        }
        _ => raw.username.clone(),
    }
}

fn to_inbound(raw: RawMessage, channel_name: String) -> InboundMessage {
    let author_name = account_name(&raw);
    let display_name = raw
        .member_nick
        .clone()
        .or_else(|| raw.global_name.clone())
        .unwrap_or_else(|| raw.username.clone());
    let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
        .map_or_else(|_| Utc::now(), |ts| ts.with_timezone(&Utc));

    InboundMessage {
        id: raw.id,
        author_id: raw.author_id,
        author_name,
        display_name,
        channel_id: raw.channel_id,
        channel_name,
        guild_id: raw.guild_id,
        timestamp,
        content: raw.content,
        attachments: raw
            .attachments
            .into_iter()
            .map(|a| Attachment {
                id: a.id,
                filename: a.filename,
                size: a.size,
                url: a.url,
            })
            .collect(),
        mentions: raw.mentions,
        mention_everyone: raw.mention_everyone,
        is_system: !is_user_message_type(raw.message_type),
    }
}

impl AttachmentReader for DiscordChannel {
    fn read_attachment<'a>(
        &'a self,
        attachment: &'a Attachment,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move { self.http.download(&attachment.url).await })
    }
}

impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn self_id(&self) -> String {
        self.bot_user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn max_message_length(&self) -> usize {
        MAX_MESSAGE_LENGTH
    }

    fn send<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.http
                .send_message(
                    &message.channel_id,
                    &message.content,
                    message.reply_to.as_deref(),
                )
                .await
                .map_err(|e| {
                    anyhow::Error::from(TransportError::Send {
                        channel: message.channel_id.clone(),
                        message: format!("{e:#}"),
                    })
                })
        })
    }

    fn listen<'a>(
        &'a self,
        tx: tokio::sync::mpsc::Sender<ChannelEvent>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let gateway = DiscordGateway::new(self.bot_token.clone(), DEFAULT_INTENTS);
            let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<GatewayEvent>(100);

            let mut gateway_handle = {
                let http = DiscordHttpClient::new(&self.bot_token);
                tokio::spawn(async move { gateway.connect_and_listen(&http, &event_tx).await })
            };

            loop {
                tokio::select! {
                    event = event_rx.recv() => {
                        let Some(event) = event else {
                            break;
                        };
                        if !self.handle_gateway_event(event, &tx).await {
                            gateway_handle.abort();
                            anyhow::bail!("relay stopped receiving Discord events");
                        }
                    }
                    result = &mut gateway_handle => {
                        while let Ok(event) = event_rx.try_recv() {
                            self.handle_gateway_event(event, &tx).await;
                        }
                        match result {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                return Err(anyhow::Error::from(TransportError::Connection {
                                    channel: "discord".into(),
                                    message: format!("{e:#}"),
                                }));
                            }
                            Err(e) => anyhow::bail!("Discord gateway task panicked: {e}"),
                        }
                        break;
                    }
                }
            }

            Ok(())
        })
    }

    fn send_typing<'a>(
        &'a self,
        channel_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move { self.http.send_typing(channel_id).await })
    }

    fn set_nickname<'a>(
        &'a self,
        guild_id: &'a str,
        nickname: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move { self.http.set_own_nickname(guild_id, nickname).await })
    }
}
