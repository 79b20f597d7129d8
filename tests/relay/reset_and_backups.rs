use std::fs;

use chatrelay::commands::Command;
use chatrelay::history::{HistoryEntry, Role};
use chatrelay::relay::Outcome;
use tempfile::TempDir;

use super::relay_harness::{
    MockChannel, SYSTEM_PROMPT, ScriptedBackend, build_relay, mention, message, test_config,
};

fn system_text() -> String {
    format!("\n{SYSTEM_PROMPT}\n")
}

#[tokio::test]
async fn reset_rotates_existing_backups_and_clears_history() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let backup_dir = config.history.backup_dir.clone();
    fs::create_dir_all(&backup_dir).unwrap();
    fs::write(backup_dir.join("backup1.json"), "older").unwrap();
    fs::write(backup_dir.join("backup2.json"), "oldest").unwrap();

    let relay = build_relay(config, ScriptedBackend::replying(&["noted"]), 0);
    let channel = MockChannel::new();
    relay
        .handle_message(&*channel, &mention("m1", "remember this"))
        .await
        .unwrap();
    let saved = fs::read_to_string(relay.store().state_file()).unwrap();

    let outcome = relay
        .handle_message(&*channel, &message("m2", "!reset"))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Command(Command::Reset));
    assert_eq!(fs::read_to_string(backup_dir.join("backup1.json")).unwrap(), saved);
    assert_eq!(fs::read_to_string(backup_dir.join("backup2.json")).unwrap(), "older");
    assert_eq!(fs::read_to_string(backup_dir.join("backup3.json")).unwrap(), "oldest");
    assert!(!relay.store().state_file().exists());

    let history = relay.snapshot();
    assert_eq!(history.entries(), &[HistoryEntry::system(system_text())]);

    let sent = channel.sent();
    let last = sent.last().unwrap();
    assert_eq!(last.content, "Conversation context has been reset.");
    assert!(last.reply_to.is_none());
}

#[tokio::test]
async fn reset_without_state_file_keeps_history() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.history.automatic_save = false;
    let relay = build_relay(config, ScriptedBackend::replying(&["ok"]), 0);
    let channel = MockChannel::new();
    relay
        .handle_message(&*channel, &mention("m1", "hello"))
        .await
        .unwrap();

    relay
        .handle_message(&*channel, &message("m2", "!reset"))
        .await
        .unwrap();

    let expected = format!(
        "The file {} does not exist.",
        relay.store().state_file().display()
    );
    assert_eq!(channel.sent_texts().last(), Some(&expected));
    assert_eq!(relay.snapshot().len(), 3);
    assert!(relay.store().backups().occupied_slots().is_empty());
}

#[tokio::test]
async fn repeated_resets_keep_newest_backup_first() {
    let tmp = TempDir::new().unwrap();
    let replies: Vec<String> = (1..=4).map(|i| format!("generation {i}")).collect();
    let reply_refs: Vec<&str> = replies.iter().map(String::as_str).collect();
    let relay = build_relay(test_config(&tmp), ScriptedBackend::replying(&reply_refs), 0);
    let channel = MockChannel::new();

    for i in 1..=4 {
        relay
            .handle_message(&*channel, &mention(&format!("q{i}"), "next"))
            .await
            .unwrap();
        relay
            .handle_message(&*channel, &message(&format!("r{i}"), "!reset"))
            .await
            .unwrap();
    }

    let backups = relay.store().backups();
    assert_eq!(backups.occupied_slots(), vec![1, 2, 3, 4]);
    for slot in 1..=4 {
        let content = fs::read_to_string(backups.slot_path(slot)).unwrap();
        assert!(
            content.contains(&format!("generation {}", 5 - slot)),
            "slot {slot} holds {content}"
        );
    }
}

#[tokio::test]
async fn restart_restores_history_under_new_prompt() {
    let tmp = TempDir::new().unwrap();
    {
        let relay = build_relay(test_config(&tmp), ScriptedBackend::replying(&["first"]), 0);
        relay
            .handle_message(&*MockChannel::new(), &mention("m1", "hello"))
            .await
            .unwrap();
    }

    let mut config = test_config(&tmp);
    config.persona.system_prompt = "A different persona.".into();
    let relay = build_relay(config, ScriptedBackend::replying(&[]), 0);

    let history = relay.snapshot();
    assert_eq!(history.len(), 3);
    assert_eq!(history.system().content, "\nA different persona.\n");
    assert_eq!(history.entries()[1].role, Role::User);
    assert_eq!(history.entries()[2], HistoryEntry::assistant("first"));
}

#[tokio::test]
async fn corrupt_state_file_starts_fresh() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    fs::write(&config.history.state_file, "[{\"role\": \"nobody\"").unwrap();

    let relay = build_relay(config, ScriptedBackend::replying(&[]), 0);
    assert_eq!(relay.snapshot().entries(), &[HistoryEntry::system(system_text())]);
}
