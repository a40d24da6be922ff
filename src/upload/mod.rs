// ABOUTME: Batch upload orchestrator: strictly sequential uploads with a fixed
// progress cadence and partial-failure tolerance

use async_trait::async_trait;
use std::fs;
use tracing::{debug, warn};

use crate::github::ContentStore;
use crate::models::{BatchResult, UploadTarget};

/// Progress notification cadence, in processed items.
const PROGRESS_EVERY: usize = 10;

/// Outbound notification sink; the bot backs this with chat messages.
#[async_trait]
pub trait Notify {
    async fn notify(&self, text: &str);
}

/// Upload every target in order, one at a time. A failed item is reported
/// and skipped; the batch always runs to completion. Returns the per-batch
/// counters for the caller's summary.
pub async fn run_batch<S, N>(targets: &[UploadTarget], store: &S, notify: &N) -> BatchResult
where
    S: ContentStore + Sync + ?Sized,
    N: Notify + Sync + ?Sized,
{
    let total = targets.len();
    notify.notify(&format!("📂 Found {total} files")).await;

    let mut result = BatchResult::default();
    for (i, target) in targets.iter().enumerate() {
        let index = i + 1;

        let uploaded = match fs::read(&target.local_path) {
            Ok(bytes) => store
                .upload(&bytes, &target.remote_path)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let failure = match uploaded {
            Ok(outcome) => {
                result.uploaded += 1;
                debug!(remote_path = %target.remote_path, ?outcome, "uploaded");
                None
            }
            Err(reason) => {
                result.failed += 1;
                warn!(remote_path = %target.remote_path, "upload failed: {reason}");
                Some(target.remote_path.clone())
            }
        };

        // Progress first, then the failure notice for the same item.
        if index % PROGRESS_EVERY == 0 || index == total {
            notify
                .notify(&format!("📊 Progress: {index}/{total}"))
                .await;
        }
        if let Some(remote_path) = failure {
            notify.notify(&format!("⚠️ Failed: {remote_path}")).await;
        }
    }

    notify
        .notify(&format!(
            "🎉 Upload complete: ✅ {} uploaded, ❌ {} failed",
            result.uploaded, result.failed
        ))
        .await;
    result
}
