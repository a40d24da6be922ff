// ABOUTME: GitHub integration module: contents API client and error types

pub mod client;
pub mod error;

pub use client::{normalize_remote_path, ContentStore, GitHubClient};
pub use error::GitHubError;
