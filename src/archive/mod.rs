// ABOUTME: ZIP archive expansion into a scoped temporary directory
// The extraction root lives exactly as long as the returned value, so the
// temporary tree is removed on every exit path.

use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

use crate::github::normalize_remote_path;
use crate::models::UploadTarget;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not a valid ZIP archive: {0}")]
    Invalid(#[from] zip::result::ZipError),

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An extracted archive: the scoped extraction root plus every regular file
/// found under it, each paired with its normalized repository path.
pub struct ExpandedArchive {
    root: TempDir,
    targets: Vec<UploadTarget>,
}

impl ExpandedArchive {
    pub fn targets(&self) -> &[UploadTarget] {
        &self.targets
    }

    #[cfg(test)]
    fn root(&self) -> &Path {
        self.root.path()
    }
}

/// Extract an archive blob and enumerate its files. Enumeration follows
/// filesystem traversal order; upload order does not affect correctness.
pub fn expand(bytes: &[u8]) -> Result<ExpandedArchive, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let root = TempDir::new()?;
    archive.extract(root.path())?;

    let mut targets = Vec::new();
    collect_files(root.path(), root.path(), &mut targets)?;
    debug!(files = targets.len(), "archive expanded");

    Ok(ExpandedArchive { root, targets })
}

fn collect_files(
    dir: &Path,
    root: &Path,
    out: &mut Vec<UploadTarget>,
) -> Result<(), std::io::Error> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, root, out)?;
        } else if path.is_file() {
            let rel = path.strip_prefix(root).unwrap_or(path.as_path());
            let dir_part = rel
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            let name = entry.file_name().to_string_lossy().to_string();
            out.push(UploadTarget {
                remote_path: normalize_remote_path(&dir_part, &name),
                local_path: path,
            });
        }
    }
    Ok(())
}
