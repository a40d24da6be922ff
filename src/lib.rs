// ABOUTME: Library crate for gitdrop exposing public API for testing and external use

pub mod archive;
pub mod bot;
pub mod config;
pub mod github;
pub mod models;
pub mod telegram;
pub mod upload;
