// ABOUTME: JSON file backed bot configuration with allow-list access control
// Loaded once at startup and saved synchronously on every mutation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Persisted configuration record. Unknown keys in the file are ignored,
/// missing keys fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub bot_token: String,
    pub github_token: String,
    pub github_user: String,
    pub repo_name: String,
    pub allowed_users: BTreeSet<String>,
    pub admin_ids: BTreeSet<String>,
}

impl BotConfig {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.contains(user_id)
    }

    /// Admins are implicitly allowed even when absent from the allow list.
    pub fn is_allowed(&self, user_id: &str) -> bool {
        self.allowed_users.contains(user_id) || self.is_admin(user_id)
    }
}

/// Owns the live [`BotConfig`] and its file path; every mutation is written
/// back before the mutating call returns.
pub struct ConfigStore {
    path: PathBuf,
    config: BotConfig,
}

impl ConfigStore {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gitdrop")
            .join("config.json")
    }

    /// Load the config file, creating it with defaults when absent.
    /// An unreadable or malformed file is replaced with defaults rather
    /// than aborting startup.
    pub fn load(path: PathBuf) -> Result<Self> {
        let config = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => {
                    info!("config loaded from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("config file {:?} is malformed ({e}), starting fresh", path);
                    BotConfig::default()
                }
            },
            Err(_) => BotConfig::default(),
        };

        let store = Self { path, config };
        if !store.path.exists() {
            store.save()?;
        }
        Ok(store)
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory {parent:?}"))?;
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write config file {:?}", self.path))
    }

    pub fn set_bot_token(&mut self, token: &str) -> Result<()> {
        self.config.bot_token = token.trim().to_string();
        self.save()
    }

    pub fn set_github_token(&mut self, token: &str) -> Result<()> {
        self.config.github_token = token.trim().to_string();
        self.save()
    }

    pub fn set_github_user(&mut self, user: &str) -> Result<()> {
        self.config.github_user = user.trim().to_string();
        self.save()
    }

    pub fn set_repo_name(&mut self, name: &str) -> Result<()> {
        self.config.repo_name = name.trim().to_string();
        self.save()
    }

    pub fn add_allowed_user(&mut self, user_id: &str) -> Result<()> {
        self.config.allowed_users.insert(user_id.trim().to_string());
        self.save()
    }

    pub fn remove_allowed_user(&mut self, user_id: &str) -> Result<()> {
        self.config.allowed_users.remove(user_id.trim());
        self.save()
    }

    pub fn add_admin(&mut self, user_id: &str) -> Result<()> {
        self.config.admin_ids.insert(user_id.trim().to_string());
        self.save()
    }
}
