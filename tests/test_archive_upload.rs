// ABOUTME: Integration tests driving ZIP expansion through the batch uploader

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use zip::write::FileOptions;
use zip::ZipWriter;

use gitdrop::archive;
use gitdrop::github::{ContentStore, GitHubError};
use gitdrop::models::UploadOutcome;
use gitdrop::upload::{run_batch, Notify};

/// In-memory stand-in for the remote store: remembers every path it has
/// seen and reports an overwrite as an update, like the real contents API.
#[derive(Default)]
struct MemoryStore {
    paths: Mutex<BTreeSet<String>>,
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn upload(
        &self,
        _content: &[u8],
        remote_path: &str,
    ) -> Result<UploadOutcome, GitHubError> {
        let mut paths = self.paths.lock().unwrap();
        if paths.insert(remote_path.to_string()) {
            Ok(UploadOutcome::Created)
        } else {
            Ok(UploadOutcome::Updated)
        }
    }
}

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

fn zip_with_files(count: usize) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for i in 0..count {
        let name = if i % 3 == 0 {
            format!("docs/page{i}.md")
        } else {
            format!("file{i}.txt")
        };
        writer.start_file(name, options).unwrap();
        writer.write_all(format!("payload {i}").as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_archive_of_23_files_uploads_with_expected_progress() {
    let expanded = archive::expand(&zip_with_files(23)).unwrap();
    assert_eq!(expanded.targets().len(), 23);

    let store = MemoryStore::default();
    let notify = RecordingNotify::default();
    let result = run_batch(expanded.targets(), &store, &notify).await;

    assert_eq!(result.uploaded, 23);
    assert_eq!(result.failed, 0);

    let messages = notify.messages.lock().unwrap().clone();
    let progress: Vec<&String> = messages.iter().filter(|m| m.starts_with("📊")).collect();
    assert_eq!(
        progress,
        vec!["📊 Progress: 10/23", "📊 Progress: 20/23", "📊 Progress: 23/23"]
    );
    assert!(messages
        .last()
        .unwrap()
        .contains("✅ 23 uploaded, ❌ 0 failed"));

    // Every archive entry landed under its relative path.
    let paths = store.paths.lock().unwrap();
    assert!(paths.contains("docs/page0.md"));
    assert!(paths.contains("file1.txt"));
}

#[tokio::test]
async fn test_reuploading_the_same_archive_reports_updates() {
    let bytes = zip_with_files(3);
    let store = MemoryStore::default();
    let notify = RecordingNotify::default();

    let first = archive::expand(&bytes).unwrap();
    run_batch(first.targets(), &store, &notify).await;

    let second = archive::expand(&bytes).unwrap();
    for target in second.targets() {
        let content = std::fs::read(&target.local_path).unwrap();
        let outcome = store.upload(&content, &target.remote_path).await.unwrap();
        assert_eq!(outcome, UploadOutcome::Updated);
    }
}

#[tokio::test]
async fn test_malformed_archive_never_reaches_the_store() {
    let result = archive::expand(b"not a zip at all");
    assert!(result.is_err());
}
