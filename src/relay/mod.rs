//! The orchestrator: gate, ingest, invoke and deliver for every inbound
//! message, with the shared conversation as a per-message critical section.
//!
//! Mutation of the conversation happens only while holding `history`.
//! After every mutation the new state is published to `snapshot`, which is
//! what read-only paths (the `logs` command, `history show`) look at, so they
//! never wait on an in-flight inference and never see a partial update.

mod nickname;
mod supervisor;

use crate::channels::{Channel, ChannelEvent, InboundMessage};
use crate::commands::{Command, handle_static, parse_command};
use crate::config::Config;
use crate::gate::{GateDecision, MessageFacts, RandomSource, ResponseGate};
use crate::history::{ConversationHistory, HistoryEntry, HistoryStore};
use crate::ingest::IngestionPipeline;
use crate::llm::{ChatBackend, InferenceInvoker};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub use nickname::{apply_nickname, capitalize, nickname_for};

/// Discord shows a typing indicator for about ten seconds per trigger.
const TYPING_REFRESH: Duration = Duration::from_secs(8);

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Logged,
    /// Ingestion refused the message; the notice was posted to the channel.
    Rejected(String),
    Replied { chunks: usize },
    Command(Command),
}

pub struct Relay {
    config: Arc<Config>,
    store: HistoryStore,
    gate: ResponseGate,
    pipeline: IngestionPipeline,
    invoker: InferenceInvoker,
    history: Mutex<ConversationHistory>,
    snapshot: ArcSwap<ConversationHistory>,
}

impl Relay {
    /// Build the relay and load the persisted conversation.
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn ChatBackend>,
        random: Box<dyn RandomSource>,
    ) -> Self {
        let store = HistoryStore::from_config(&config.history, config.persona.system_entry_text());
        let history = store.load();

        Self {
            gate: ResponseGate::new(config.gate.clone(), random),
            pipeline: IngestionPipeline::new(config.limits.clone()),
            invoker: InferenceInvoker::from_config(backend, &config.model),
            snapshot: ArcSwap::from_pointee(history.clone()),
            history: Mutex::new(history),
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Latest published state of the conversation.
    pub fn snapshot(&self) -> Arc<ConversationHistory> {
        self.snapshot.load_full()
    }

    fn publish(&self, history: &ConversationHistory) {
        self.snapshot.store(Arc::new(history.clone()));
    }

    /// Listen on `channel` until Ctrl-C.
    pub async fn run(self: Arc<Self>, channel: Arc<dyn Channel>) -> Result<()> {
        self.serve(channel, async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Listen on `channel` until `shutdown` resolves or the listener goes
    /// away. Each event is handled on its own task; the history lock keeps
    /// exchanges from interleaving.
    pub async fn serve(
        self: Arc<Self>,
        channel: Arc<dyn Channel>,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ChannelEvent>(100);
        let listener = supervisor::spawn_supervised_listener(
            Arc::clone(&channel),
            tx,
            supervisor::INITIAL_BACKOFF_SECS,
            supervisor::MAX_BACKOFF_SECS,
        );

        tracing::info!(
            channel = channel.name(),
            model = %self.config.model.name,
            entries = self.snapshot().len(),
            "relay listening"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    let relay = Arc::clone(&self);
                    let channel = Arc::clone(&channel);
                    tokio::spawn(async move {
                        relay.handle_event(channel.as_ref(), event).await;
                    });
                }
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        listener.abort();
        Ok(())
    }

    /// Handle one event; failures are logged, never propagated.
    pub async fn handle_event(&self, channel: &dyn Channel, event: ChannelEvent) {
        match event {
            ChannelEvent::GuildAvailable(guild) => {
                apply_nickname(channel, &guild, &self.config).await;
            }
            ChannelEvent::Message(message) => {
                if let Err(error) = self.handle_message(channel, &message).await {
                    tracing::error!(
                        channel = %message.channel_id,
                        message_id = %message.id,
                        error = %format!("{error:#}"),
                        "failed to handle message"
                    );
                }
            }
        }
    }

    pub async fn handle_message(
        &self,
        channel: &dyn Channel,
        message: &InboundMessage,
    ) -> Result<Outcome> {
        let self_id = channel.self_id();
        if !self_id.is_empty() && message.author_id == self_id {
            return Ok(Outcome::Ignored);
        }

        let prefix = &self.config.gate.command_prefix;
        if let Some(command) = parse_command(&message.content, prefix) {
            self.handle_command(channel, message, command).await?;
            return Ok(Outcome::Command(command));
        }

        let facts = MessageFacts::from_message(message, &self_id, prefix);
        match self.gate.decide(&facts) {
            GateDecision::Ignore => Ok(Outcome::Ignored),
            GateDecision::LogOnly => {
                self.log_only(message).await;
                Ok(Outcome::Logged)
            }
            GateDecision::Engage => self.exchange(channel, message).await,
        }
    }

    async fn log_only(&self, message: &InboundMessage) {
        let entry = self.pipeline.log_entry(message);
        let mut history = self.history.lock().await;
        history.append(entry);
        history.trim(self.config.history.max_size);
        self.publish(&history);
        tracing::debug!(channel = %message.channel_id, entries = history.len(), "message logged");
    }

    async fn exchange(&self, channel: &dyn Channel, message: &InboundMessage) -> Result<Outcome> {
        let entry = match self.pipeline.ingest(message, channel).await {
            Ok(entry) => entry,
            Err(error) => {
                tracing::info!(channel = %message.channel_id, %error, "message rejected");
                let notice = error.user_message();
                channel
                    .send_chunked(
                        &notice,
                        &message.channel_id,
                        None,
                        self.config.limits.max_chunk_size,
                    )
                    .await?;
                return Ok(Outcome::Rejected(notice));
            }
        };

        let (reply, save_error) = {
            let mut history = self.history.lock().await;
            history.append(entry);

            let reply = match self
                .invoke_with_typing(channel, &message.channel_id, history.entries())
                .await
            {
                Ok(text) => text,
                Err(error) => error.reply_text(),
            };

            history.append(HistoryEntry::assistant(reply.clone()));
            history.trim(self.config.history.max_size);

            let save_error = if self.config.history.automatic_save {
                self.store.save(&history).err()
            } else {
                None
            };
            self.publish(&history);
            (reply, save_error)
        };

        let chunks = channel
            .send_chunked(
                &reply,
                &message.channel_id,
                Some(&message.id),
                self.config.limits.max_chunk_size,
            )
            .await?;

        if let Some(error) = save_error {
            tracing::error!(%error, "automatic save failed");
            channel
                .send_chunked(
                    &error.user_message(),
                    &message.channel_id,
                    None,
                    self.config.limits.max_chunk_size,
                )
                .await?;
        }

        Ok(Outcome::Replied { chunks })
    }

    async fn invoke_with_typing(
        &self,
        channel: &dyn Channel,
        channel_id: &str,
        entries: &[HistoryEntry],
    ) -> Result<String, crate::error::InferenceError> {
        let call = self.invoker.invoke(entries);
        tokio::pin!(call);
        let mut typing = tokio::time::interval(TYPING_REFRESH);

        loop {
            tokio::select! {
                result = &mut call => return result,
                _ = typing.tick() => {
                    if let Err(error) = channel.send_typing(channel_id).await {
                        tracing::debug!(error = %format!("{error:#}"), "typing indicator failed");
                    }
                }
            }
        }
    }

    async fn handle_command(
        &self,
        channel: &dyn Channel,
        message: &InboundMessage,
        command: Command,
    ) -> Result<()> {
        tracing::info!(%command, channel = %message.channel_id, "command received");
        let max_chars = self.config.limits.max_chunk_size;
        let reply = |text: String| async move {
            channel
                .send_chunked(&text, &message.channel_id, None, max_chars)
                .await
                .map(|_| ())
        };

        if let Some(result) = handle_static(command, &self.config) {
            return reply(result.text).await;
        }

        match command {
            Command::Reset => {
                let text = {
                    let mut history = self.history.lock().await;
                    match self.store.reset(&mut history) {
                        Ok(()) => {
                            self.publish(&history);
                            "Conversation context has been reset.".to_string()
                        }
                        Err(error) => {
                            tracing::warn!(%error, "reset refused");
                            error.user_message()
                        }
                    }
                };
                reply(text).await
            }
            Command::Save => {
                reply("Saving".to_string()).await?;
                let result = {
                    let history = self.history.lock().await;
                    self.store.save(&history)
                };
                if let Err(error) = result {
                    tracing::error!(%error, "manual save failed");
                    reply(error.user_message()).await?;
                }
                Ok(())
            }
            Command::Logs => {
                let rendered = self.snapshot().render();
                tracing::info!(history = %rendered, "conversation log requested");
                reply(rendered).await
            }
            Command::Model | Command::Char | Command::System | Command::Help => Ok(()),
        }
    }
}
