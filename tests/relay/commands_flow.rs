use std::sync::Arc;
use std::time::Duration;

use chatrelay::channels::Channel;
use chatrelay::commands::Command;
use chatrelay::history::HistoryEntry;
use chatrelay::relay::Outcome;
use tempfile::TempDir;

use super::relay_harness::{
    MockChannel, ScriptedBackend, build_relay, mention, message, test_config,
};

#[tokio::test]
async fn info_commands_answer_from_config() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.model.name = "mistral".into();
    config.persona.name = "Ada".into();
    let backend = ScriptedBackend::replying(&[]);
    let relay = build_relay(config, backend.clone(), 0);
    let channel = MockChannel::new();

    for (id, text) in [("m1", "!model"), ("m2", "!CHAR"), ("m3", "!system")] {
        relay.handle_message(&*channel, &message(id, text)).await.unwrap();
    }

    assert_eq!(
        channel.sent_texts(),
        vec![
            "Current model: mistral".to_string(),
            "Character: Ada".to_string(),
            "SYSTEM :\n \nYou are a helpful relay.\n".to_string(),
        ]
    );
    assert!(channel.sent().iter().all(|m| m.reply_to.is_none()));
    assert!(backend.calls().is_empty());
    assert_eq!(relay.snapshot().len(), 1, "commands are not recorded");
}

#[tokio::test]
async fn command_wins_over_mention() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::replying(&["unused"]);
    let relay = build_relay(test_config(&tmp), backend.clone(), 0);
    let channel = MockChannel::new();

    let outcome = relay
        .handle_message(&*channel, &mention("m1", "!model extra args"))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Command(Command::Model));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn save_command_writes_state_file() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.history.automatic_save = false;
    let relay = build_relay(config, ScriptedBackend::replying(&["stored"]), 0);
    let channel = MockChannel::new();

    relay
        .handle_message(&*channel, &mention("m1", "keep this"))
        .await
        .unwrap();
    assert!(!relay.store().state_file().exists());

    relay
        .handle_message(&*channel, &message("m2", "!save"))
        .await
        .unwrap();

    assert_eq!(channel.sent_texts().last().map(String::as_str), Some("Saving"));
    let saved = std::fs::read_to_string(relay.store().state_file()).unwrap();
    let records: Vec<HistoryEntry> = serde_json::from_str(&saved).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2], HistoryEntry::assistant("stored"));
}

#[tokio::test]
async fn logs_command_posts_rendered_history() {
    let tmp = TempDir::new().unwrap();
    let relay = build_relay(test_config(&tmp), ScriptedBackend::replying(&["pong"]), 0);
    let channel = MockChannel::new();

    relay
        .handle_message(&*channel, &mention("m1", "ping"))
        .await
        .unwrap();
    relay
        .handle_message(&*channel, &message("m2", "!logs"))
        .await
        .unwrap();

    let logs = channel.sent_texts().pop().unwrap();
    assert!(logs.starts_with("[system] \nYou are a helpful relay.\n"));
    assert!(logs.contains("[user] Display Name (Username) in Channel - Timestamp"));
    assert!(logs.ends_with("[assistant] pong"));
}

#[tokio::test]
async fn help_lists_every_command_with_prefix() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.gate.command_prefix = "?".into();
    let relay = build_relay(config, ScriptedBackend::replying(&[]), 0);
    let channel = MockChannel::new();

    relay
        .handle_message(&*channel, &message("m1", "?help"))
        .await
        .unwrap();

    let help = channel.sent_texts().pop().unwrap();
    for name in ["?reset", "?model", "?char", "?save", "?logs", "?system", "?help"] {
        assert!(help.contains(name), "missing {name}");
    }
}

#[tokio::test]
async fn serve_stops_on_shutdown_signal() {
    let tmp = TempDir::new().unwrap();
    let relay = Arc::new(build_relay(test_config(&tmp), ScriptedBackend::replying(&[]), 0));
    let channel: Arc<dyn Channel> = MockChannel::new();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        Arc::clone(&relay).serve(channel, tokio::time::sleep(Duration::from_millis(20))),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
}
