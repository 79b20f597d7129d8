use chatrelay::relay::Outcome;
use tempfile::TempDir;

use super::relay_harness::{
    MockChannel, ScriptedBackend, build_relay, mention, test_config, text_attachment,
};

#[tokio::test]
async fn oversized_attachment_is_rejected_before_download() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::replying(&["unused"]);
    let relay = build_relay(test_config(&tmp), backend.clone(), 0);
    let channel = MockChannel::new();

    let mut msg = mention("m1", "please read");
    msg.attachments.push(text_attachment("big.txt", 3 * 1024 * 1024));

    let outcome = relay.handle_message(&*channel, &msg).await.unwrap();

    let notice = "The file big.txt is too large. Please send files smaller than 2.0 MB.";
    assert_eq!(outcome, Outcome::Rejected(notice.to_string()));
    assert_eq!(channel.sent_texts(), vec![notice.to_string()]);
    assert_eq!(channel.downloads(), 0);
    assert!(backend.calls().is_empty());
    assert_eq!(relay.snapshot().len(), 1, "rejection appends nothing");
}

#[tokio::test]
async fn binary_attachment_is_rejected_without_side_effects() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::replying(&["unused"]);
    let relay = build_relay(test_config(&tmp), backend.clone(), 0);
    let channel = MockChannel::new();
    let attachment = text_attachment("image.png", 4);
    channel.add_file(&attachment.url, &[0x89, 0x50, 0xff, 0xfe]);

    let mut msg = mention("m1", "what is this");
    msg.attachments.push(attachment);

    let outcome = relay.handle_message(&*channel, &msg).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Rejected("The file image.png is not a valid text file.".to_string())
    );
    assert!(backend.calls().is_empty());
    assert_eq!(relay.snapshot().len(), 1);
    assert!(!relay.store().state_file().exists());
}

#[tokio::test]
async fn second_attachment_pushing_total_over_limit_rejects_whole_message() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.limits.max_attachment_chars = 100;
    let backend = ScriptedBackend::replying(&["unused"]);
    let relay = build_relay(config, backend.clone(), 0);
    let channel = MockChannel::new();

    let first = text_attachment("a.txt", 60);
    let second = text_attachment("b.txt", 60);
    channel.add_file(&first.url, "a".repeat(60).as_bytes());
    channel.add_file(&second.url, "b".repeat(60).as_bytes());

    let mut msg = mention("m1", "two files");
    msg.attachments = vec![first, second];

    let outcome = relay.handle_message(&*channel, &msg).await.unwrap();

    assert!(matches!(outcome, Outcome::Rejected(ref notice) if notice.contains("100 characters")));
    assert!(backend.calls().is_empty());
    assert_eq!(relay.snapshot().len(), 1);
}

#[tokio::test]
async fn missing_attachment_reports_download_failure() {
    let tmp = TempDir::new().unwrap();
    let relay = build_relay(test_config(&tmp), ScriptedBackend::replying(&[]), 0);
    let channel = MockChannel::new();

    let mut msg = mention("m1", "here");
    msg.attachments.push(text_attachment("gone.txt", 10));

    let outcome = relay.handle_message(&*channel, &msg).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Rejected("The file gone.txt could not be downloaded.".to_string())
    );
    assert_eq!(channel.downloads(), 1);
}

#[tokio::test]
async fn accepted_attachments_are_inlined_in_order() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::replying(&["looks good"]);
    let relay = build_relay(test_config(&tmp), backend.clone(), 0);
    let channel = MockChannel::new();

    let notes = text_attachment("notes.txt", 5);
    let todo = text_attachment("todo.md", 4);
    channel.add_file(&notes.url, b"hello");
    channel.add_file(&todo.url, b"- go");

    let mut msg = mention("m1", "review these");
    msg.attachments = vec![notes, todo];

    let outcome = relay.handle_message(&*channel, &msg).await.unwrap();
    assert_eq!(outcome, Outcome::Replied { chunks: 1 });

    let history = relay.snapshot();
    let user = &history.entries()[1].content;
    assert!(user.ends_with("review these\n\n\n\nnotes.txt\nhello\n\n\ntodo.md\n- go\n"));
    assert_eq!(backend.calls()[0][1].content, *user);
}
