// ABOUTME: Bot wiring: long-poll loop, authorization gate, and message handling glue
// Text goes to command dispatch or the config dialog, attachments to the
// upload pipeline; everything runs on the single control task.

pub mod router;
pub mod session;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::archive;
use crate::config::ConfigStore;
use crate::github::{normalize_remote_path, ContentStore, GitHubClient, GitHubError};
use crate::models::RemoteEntry;
use crate::telegram::{Document, FetchAttachment, Message, TelegramClient};
use crate::upload::{self, Notify};
use self::router::{Command, CommandEffect};
use self::session::{FollowUp, ProbeOutcome, SessionStore};

const IDLE_DELAY: Duration = Duration::from_secs(1);
const ERROR_BACKOFF: Duration = Duration::from_secs(5);
const LIST_DISPLAY_LIMIT: usize = 30;

pub struct Bot {
    telegram: TelegramClient,
    config: ConfigStore,
    sessions: SessionStore,
    last_update_id: i64,
}

/// Notification sink bound to one chat. Send failures are logged, never
/// propagated; a lost notification must not break message handling.
struct ChatNotifier<'a> {
    telegram: &'a TelegramClient,
    chat_id: i64,
}

#[async_trait]
impl Notify for ChatNotifier<'_> {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.telegram.send_message(self.chat_id, text).await {
            warn!(chat_id = self.chat_id, "failed to send notification: {e}");
        }
    }
}

impl Bot {
    pub fn new(config: ConfigStore) -> Self {
        let telegram = TelegramClient::new(&config.config().bot_token);
        Self {
            telegram,
            config,
            sessions: SessionStore::new(),
            last_update_id: 0,
        }
    }

    /// Long-poll loop. Poll errors back off and retry; only ctrl-c exits,
    /// between iterations.
    pub async fn run(&mut self) -> Result<()> {
        info!("bot started, polling for updates");
        loop {
            let polled = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("stop signal received, shutting down");
                    break;
                }
                polled = self.telegram.get_updates(self.last_update_id + 1) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        self.last_update_id = update.update_id;
                        if let Some(message) = update.message {
                            self.handle_message(message).await;
                        }
                    }
                    tokio::time::sleep(IDLE_DELAY).await;
                }
                Err(e) => {
                    warn!("poll error: {e}");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
        Ok(())
    }

    async fn handle_message(&mut self, message: Message) {
        let Bot {
            telegram,
            config,
            sessions,
            ..
        } = self;
        let telegram: &TelegramClient = telegram;

        let notifier = ChatNotifier {
            telegram,
            chat_id: message.chat.id,
        };
        Self::process_message(config, sessions, telegram, &notifier, message).await;
    }

    /// Handle one inbound message against any transport. The authorization
    /// gate runs before anything else; an unauthorized sender gets exactly
    /// one denial and no further interaction.
    pub async fn process_message<F, N>(
        config: &mut ConfigStore,
        sessions: &mut SessionStore,
        fetcher: &F,
        notifier: &N,
        message: Message,
    ) where
        F: FetchAttachment + Sync + ?Sized,
        N: Notify + Sync + ?Sized,
    {
        let Some(user_id) = message.from.as_ref().map(|u| u.id.to_string()) else {
            debug!("message without sender, ignoring");
            return;
        };

        if !config.config().is_allowed(&user_id) {
            warn!(%user_id, "unauthorized access attempt");
            notifier.notify(router::ACCESS_DENIED).await;
            return;
        }

        if let Some(text) = message.text.clone() {
            Self::handle_text(config, sessions, notifier, &user_id, &text).await;
        } else if let Some(document) = message.document {
            Self::handle_document(fetcher, config, notifier, document).await;
        }
    }

    async fn handle_text<N>(
        config: &mut ConfigStore,
        sessions: &mut SessionStore,
        notifier: &N,
        user_id: &str,
        text: &str,
    ) where
        N: Notify + Sync + ?Sized,
    {
        // Command dispatch always wins over an open session.
        if let Some(command) = Command::parse(text) {
            debug!(%user_id, ?command, "dispatching command");
            let reply = router::dispatch(&command, user_id, config, sessions);
            for message in &reply.messages {
                notifier.notify(message).await;
            }
            if let Some(CommandEffect::ListFiles) = reply.effect {
                let message = match Self::list_files(config).await {
                    Ok(listing) => format!("📂 Files:\n\n{listing}"),
                    Err(e) => format!("❌ {e}"),
                };
                notifier.notify(&message).await;
            }
            return;
        }

        if !sessions.is_active(user_id) {
            debug!(%user_id, "free text with no active session, ignoring");
            return;
        }

        match sessions.advance(user_id, text, config) {
            Ok(advance) => {
                for message in &advance.messages {
                    notifier.notify(message).await;
                }
                match advance.follow_up {
                    Some(FollowUp::ProbeRepo) => {
                        let outcome = Self::probe_repo(config).await;
                        let message = sessions.on_probe_result(user_id, outcome);
                        notifier.notify(&message).await;
                    }
                    Some(FollowUp::CreateRepo) => {
                        let message = match Self::create_repo(config).await {
                            Ok(name) => format!("✅ Repo '{name}' created"),
                            Err(e) => format!("❌ Error: {e}"),
                        };
                        notifier.notify(&message).await;
                    }
                    None => {}
                }
            }
            Err(e) => {
                error!("session transition failed: {e:#}");
                notifier.notify("❌ Failed to save config").await;
            }
        }
    }

    async fn list_files(config: &ConfigStore) -> Result<String, GitHubError> {
        let client = GitHubClient::from_config(config.config())?;
        let entries = client.list("").await?;
        if entries.is_empty() {
            return Ok("📭 Empty".to_string());
        }
        Ok(entries
            .iter()
            .take(LIST_DISPLAY_LIMIT)
            .map(RemoteEntry::format)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn probe_repo(config: &ConfigStore) -> ProbeOutcome {
        match GitHubClient::from_config(config.config()) {
            Ok(client) => match client.repo_exists().await {
                Ok(true) => ProbeOutcome::Found,
                Ok(false) => ProbeOutcome::Missing,
                Err(e) => {
                    warn!("repository probe failed: {e}");
                    ProbeOutcome::Unknown
                }
            },
            Err(e) => {
                warn!("repository probe skipped: {e}");
                ProbeOutcome::Unknown
            }
        }
    }

    async fn create_repo(config: &ConfigStore) -> Result<String, GitHubError> {
        let client = GitHubClient::from_config(config.config())?;
        let name = config.config().repo_name.clone();
        client.create_repo(&name).await?;
        Ok(name)
    }

    async fn handle_document<F, N>(
        fetcher: &F,
        config: &ConfigStore,
        notifier: &N,
        document: Document,
    ) where
        F: FetchAttachment + Sync + ?Sized,
        N: Notify + Sync + ?Sized,
    {
        let filename = document
            .file_name
            .clone()
            .unwrap_or_else(|| "file".to_string());
        notifier.notify(&format!("📥 Downloading: {filename}")).await;

        let bytes = match fetcher.fetch(&document.file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("attachment download failed: {e}");
                notifier.notify("❌ Download failed").await;
                return;
            }
        };

        let store = match GitHubClient::from_config(config.config()) {
            Ok(client) => client,
            Err(e) => {
                notifier.notify(&format!("❌ {e}")).await;
                return;
            }
        };

        if filename.to_lowercase().ends_with(".zip") {
            notifier.notify("📦 ZIP detected!").await;
            match archive::expand(&bytes) {
                Ok(expanded) => {
                    let result = upload::run_batch(expanded.targets(), &store, notifier).await;
                    info!(
                        uploaded = result.uploaded,
                        failed = result.failed,
                        "batch finished"
                    );
                }
                Err(e) => notifier.notify(&format!("❌ ZIP error: {e}")).await,
            }
        } else {
            // Single-file attachments bypass the batch orchestrator.
            let remote_path = normalize_remote_path("", &filename);
            notifier.notify(&format!("📤 Uploading: {remote_path}")).await;
            match store.upload(&bytes, &remote_path).await {
                Ok(outcome) => {
                    notifier
                        .notify(&format!("✅ {}: {remote_path}", outcome.verb()))
                        .await;
                }
                Err(e) => notifier.notify(&format!("❌ {e}")).await,
            }
        }
    }
}
