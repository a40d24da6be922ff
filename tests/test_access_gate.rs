// ABOUTME: Integration tests for the authorization gate on inbound messages

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::tempdir;

use gitdrop::bot::router::ACCESS_DENIED;
use gitdrop::bot::session::SessionStore;
use gitdrop::bot::Bot;
use gitdrop::config::ConfigStore;
use gitdrop::telegram::{Chat, Document, FetchAttachment, Message, TelegramError, User};
use gitdrop::upload::Notify;

#[derive(Default)]
struct RecordingNotify {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notify for RecordingNotify {
    async fn notify(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

impl RecordingNotify {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

/// Counts fetches instead of talking to the transport; any call from an
/// unauthorized sender is a gate breach.
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl FetchAttachment for CountingFetcher {
    async fn fetch(&self, _file_id: &str) -> Result<Vec<u8>, TelegramError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn config_with_admin(dir: &tempfile::TempDir, admin: &str) -> ConfigStore {
    let mut config = ConfigStore::load(dir.path().join("config.json")).unwrap();
    config.add_admin(admin).unwrap();
    config
}

fn text_message(user: i64, text: &str) -> Message {
    Message {
        chat: Chat { id: 7 },
        from: Some(User { id: user }),
        text: Some(text.to_string()),
        document: None,
    }
}

fn document_message(user: i64) -> Message {
    Message {
        chat: Chat { id: 7 },
        from: Some(User { id: user }),
        text: None,
        document: Some(Document {
            file_id: "f1".to_string(),
            file_name: Some("notes.txt".to_string()),
        }),
    }
}

#[tokio::test]
async fn test_unknown_user_text_gets_exactly_one_denial() {
    let dir = tempdir().unwrap();
    let mut config = config_with_admin(&dir, "1");
    let mut sessions = SessionStore::new();
    let fetcher = CountingFetcher::default();
    let notify = RecordingNotify::default();

    Bot::process_message(
        &mut config,
        &mut sessions,
        &fetcher,
        &notify,
        text_message(999, "hello"),
    )
    .await;

    assert_eq!(notify.messages(), vec![ACCESS_DENIED.to_string()]);
    assert!(!sessions.is_active("999"));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_user_command_is_denied_before_dispatch() {
    let dir = tempdir().unwrap();
    let mut config = config_with_admin(&dir, "1");
    let before = serde_json::to_string(config.config()).unwrap();
    let mut sessions = SessionStore::new();
    let fetcher = CountingFetcher::default();
    let notify = RecordingNotify::default();

    Bot::process_message(
        &mut config,
        &mut sessions,
        &fetcher,
        &notify,
        text_message(999, "/setconfig"),
    )
    .await;

    assert_eq!(notify.messages(), vec![ACCESS_DENIED.to_string()]);
    assert!(!sessions.is_active("999"));
    assert_eq!(serde_json::to_string(config.config()).unwrap(), before);
}

#[tokio::test]
async fn test_unknown_user_document_is_denied_without_download() {
    let dir = tempdir().unwrap();
    let mut config = config_with_admin(&dir, "1");
    let mut sessions = SessionStore::new();
    let fetcher = CountingFetcher::default();
    let notify = RecordingNotify::default();

    Bot::process_message(
        &mut config,
        &mut sessions,
        &fetcher,
        &notify,
        document_message(999),
    )
    .await;

    assert_eq!(notify.messages(), vec![ACCESS_DENIED.to_string()]);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_allowed_user_document_passes_the_gate() {
    let dir = tempdir().unwrap();
    let mut config = config_with_admin(&dir, "1");
    config.add_allowed_user("2").unwrap();
    let mut sessions = SessionStore::new();
    let fetcher = CountingFetcher::default();
    let notify = RecordingNotify::default();

    Bot::process_message(
        &mut config,
        &mut sessions,
        &fetcher,
        &notify,
        document_message(2),
    )
    .await;

    // The gate passed and the attachment was fetched; the upload then stops
    // at the unconfigured store, never silently.
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    let messages = notify.messages();
    assert_eq!(messages[0], "📥 Downloading: notes.txt");
    assert!(messages.last().unwrap().contains("GitHub config not set"));
}

#[tokio::test]
async fn test_message_without_sender_is_ignored() {
    let dir = tempdir().unwrap();
    let mut config = config_with_admin(&dir, "1");
    let mut sessions = SessionStore::new();
    let fetcher = CountingFetcher::default();
    let notify = RecordingNotify::default();

    let message = Message {
        chat: Chat { id: 7 },
        from: None,
        text: Some("hello".to_string()),
        document: None,
    };
    Bot::process_message(&mut config, &mut sessions, &fetcher, &notify, message).await;

    assert!(notify.messages().is_empty());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}
