// ABOUTME: Error types for the GitHub contents API client

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub config not set")]
    NotConfigured,

    #[error("GitHub API error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}
