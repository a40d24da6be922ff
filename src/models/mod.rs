// ABOUTME: Core data types shared across the relay: upload targets, remote entries, batch results

use std::path::PathBuf;

/// One pending write against the remote store: a local file and the
/// repository-relative path it should land at.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub local_path: PathBuf,
    pub remote_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntryKind {
    File,
    Dir,
}

/// A single entry returned when listing a repository path. Transient,
/// only used to compose the listing reply.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: RemoteEntryKind,
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn format(&self) -> String {
        match self.kind {
            RemoteEntryKind::File => {
                let size_kb = self.size.unwrap_or(0) as f64 / 1024.0;
                format!("📄 {} ({size_kb:.1} KB)", self.name)
            }
            RemoteEntryKind::Dir => format!("📁 {}/", self.name),
        }
    }
}

/// Whether an upload created a new entry or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Created,
    Updated,
}

impl UploadOutcome {
    pub fn verb(&self) -> &'static str {
        match self {
            UploadOutcome::Created => "created",
            UploadOutcome::Updated => "updated",
        }
    }
}

/// Counters for one batch upload invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub uploaded: u32,
    pub failed: u32,
}

impl BatchResult {
    pub fn total(&self) -> u32 {
        self.uploaded + self.failed
    }
}
