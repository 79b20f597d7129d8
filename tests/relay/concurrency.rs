use std::sync::Arc;
use std::time::Duration;

use chatrelay::channels::{Channel, ChannelEvent};
use chatrelay::history::{HistoryEntry, Role};
use chatrelay::relay::Relay;
use tempfile::TempDir;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;

use super::relay_harness::{
    MockChannel, Scripted, ScriptedBackend, build_relay, mention, message, test_config,
    text_attachment, wait_until,
};

struct Running {
    events: tokio::sync::mpsc::Sender<ChannelEvent>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl Running {
    async fn push(&self, msg: chatrelay::channels::InboundMessage) {
        self.events.send(ChannelEvent::Message(msg)).await.unwrap();
    }

    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.task.await.unwrap().unwrap();
    }
}

fn start(relay: &Arc<Relay>) -> (Arc<MockChannel>, Running) {
    let (channel, events) = MockChannel::with_inbox();
    let (stop, stopped) = oneshot::channel::<()>();
    let serve_channel: Arc<dyn Channel> = channel.clone();
    let task = tokio::spawn(Arc::clone(relay).serve(serve_channel, async move {
        let _ = stopped.await;
    }));
    (channel, Running { events, stop, task })
}

#[tokio::test]
async fn read_only_commands_answer_during_inference_from_prior_snapshot() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Notify::new());
    let backend = ScriptedBackend::new(vec![Scripted::Gated(gate.clone(), "late".into())]);
    let relay = Arc::new(build_relay(test_config(&tmp), backend.clone(), 0));
    let (channel, running) = start(&relay);

    running.push(mention("m1", "slow question")).await;
    wait_until(|| backend.calls().len() == 1).await;

    running.push(message("c1", "!model")).await;
    running.push(message("c2", "!logs")).await;
    wait_until(|| channel.sent().len() == 2).await;

    let mut replies = channel.sent_texts();
    replies.sort();
    assert_eq!(
        replies,
        vec![
            "Current model: llama3".to_string(),
            "[system] \nYou are a helpful relay.\n".to_string(),
        ]
    );
    assert_eq!(relay.snapshot().len(), 1, "exchange not published yet");

    gate.notify_one();
    wait_until(|| channel.sent_texts().iter().any(|t| t == "late")).await;
    assert_eq!(relay.snapshot().len(), 3);

    running.shutdown().await;
}

#[tokio::test]
async fn concurrent_exchanges_append_contiguous_pairs() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Notify::new());
    let backend = ScriptedBackend::new(vec![
        Scripted::Gated(gate.clone(), "answer one".into()),
        Scripted::Reply("answer two".into()),
    ]);
    let relay = Arc::new(build_relay(test_config(&tmp), backend.clone(), 0));
    let (channel, running) = start(&relay);

    running.push(mention("m1", "question one")).await;
    wait_until(|| backend.calls().len() == 1).await;
    running.push(mention("m2", "question two")).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.calls().len(), 1, "second exchange waits for the first");

    gate.notify_one();
    wait_until(|| channel.sent().len() == 2).await;

    let history = relay.snapshot();
    let roles: Vec<Role> = history.entries().iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert!(history.entries()[1].content.ends_with("question one"));
    assert_eq!(history.entries()[2], HistoryEntry::assistant("answer one"));
    assert!(history.entries()[3].content.ends_with("question two"));
    assert_eq!(history.entries()[4], HistoryEntry::assistant("answer two"));

    let calls = backend.calls();
    assert_eq!(calls[1].len(), 4, "second call sees the completed first pair");

    running.shutdown().await;
}

#[tokio::test]
async fn reset_waits_for_in_flight_exchange() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Notify::new());
    let backend = ScriptedBackend::new(vec![Scripted::Gated(gate.clone(), "kept".into())]);
    let relay = Arc::new(build_relay(test_config(&tmp), backend.clone(), 0));
    let (channel, running) = start(&relay);

    running.push(mention("m1", "before reset")).await;
    wait_until(|| backend.calls().len() == 1).await;
    running.push(message("r1", "!reset")).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(channel.sent().is_empty(), "reset must not answer mid-exchange");
    assert!(relay.store().backups().occupied_slots().is_empty());

    gate.notify_one();
    wait_until(|| channel.sent().len() == 2).await;

    let mut replies = channel.sent_texts();
    replies.sort();
    assert_eq!(
        replies,
        vec![
            "Conversation context has been reset.".to_string(),
            "kept".to_string(),
        ]
    );
    let backup = std::fs::read_to_string(relay.store().backups().slot_path(1)).unwrap();
    assert!(backup.contains("kept"));
    assert_eq!(relay.snapshot().len(), 1);

    running.shutdown().await;
}

#[tokio::test]
async fn slow_attachment_does_not_hold_up_later_messages() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::replying(&["plain answer", "file answer"]);
    let relay = Arc::new(build_relay(test_config(&tmp), backend.clone(), 0));
    let (channel, running) = start(&relay);
    let download = Arc::new(Notify::new());
    channel.gate_downloads(download.clone());

    let notes = text_attachment("notes.txt", 5);
    channel.add_file(&notes.url, b"hello");
    let mut with_file = mention("m1", "see attached");
    with_file.attachments.push(notes);

    running.push(with_file).await;
    wait_until(|| channel.downloads() == 1).await;
    running.push(mention("m2", "quick one")).await;
    wait_until(|| channel.sent().len() == 1).await;
    assert_eq!(channel.sent_texts(), vec!["plain answer".to_string()]);

    download.notify_one();
    wait_until(|| channel.sent().len() == 2).await;

    let history = relay.snapshot();
    let contents: Vec<&str> = history.entries()[1..]
        .iter()
        .map(|e| e.content.as_str())
        .collect();
    assert!(contents[0].ends_with("quick one"));
    assert_eq!(contents[1], "plain answer");
    assert!(contents[2].contains("see attached"));
    assert_eq!(contents[3], "file answer");

    running.shutdown().await;
}
