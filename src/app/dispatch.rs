use crate::channels::{Channel, DiscordChannel};
use crate::cli::{Cli, Commands, HistoryCommands};
use crate::config::Config;
use crate::error::ConfigError;
use crate::gate::ThreadRandom;
use crate::history::HistoryStore;
use crate::llm::{ChatBackend, OllamaBackend};
use crate::relay::Relay;
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run => run_relay(Arc::new(config)).await,
        Commands::History { command } => match command {
            HistoryCommands::Show { json } => show_history(&config, json),
            HistoryCommands::Reset => reset_history(&config),
        },
    }
}

async fn run_relay(config: Arc<Config>) -> Result<()> {
    if config.discord.bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "a Discord bot token is required (set DISCORD_TOKEN or discord.bot_token)".into(),
        )
        .into());
    }

    let backend: Arc<dyn ChatBackend> = Arc::new(OllamaBackend::new(&config.model.base_url));
    let channel: Arc<dyn Channel> = Arc::new(DiscordChannel::new(&config.discord));
    let relay = Arc::new(Relay::new(
        Arc::clone(&config),
        backend,
        Box::new(ThreadRandom),
    ));

    println!("chatrelay:");
    println!("  > model: {} ({})", config.model.name, config.model.base_url);
    println!("  > persona: {}", config.persona.name);
    println!(
        "  > history: {} (auto-save: {})",
        config.history.state_file.display(),
        if config.history.automatic_save {
            "on"
        } else {
            "off"
        }
    );
    println!();

    relay.run(channel).await
}

fn store_for(config: &Config) -> HistoryStore {
    HistoryStore::from_config(&config.history, config.persona.system_entry_text())
}

fn show_history(config: &Config, json: bool) -> Result<()> {
    let history = store_for(config).load();
    if json {
        let rendered =
            serde_json::to_string_pretty(&history).context("serialize conversation history")?;
        println!("{rendered}");
    } else {
        println!("{}", history.render());
    }
    Ok(())
}

fn reset_history(config: &Config) -> Result<()> {
    let store = store_for(config);
    let mut history = store.load();
    store
        .reset(&mut history)
        .map_err(|error| anyhow::anyhow!(error.user_message()))?;
    println!("Conversation context has been reset.");
    Ok(())
}
