// ABOUTME: Per-user configuration dialog state machine behind /setconfig
// Transitions mutate the config directly; steps that need the network are
// returned as follow-up values for the caller to execute.

use std::collections::HashMap;
use tracing::debug;

use crate::config::ConfigStore;

/// The step a user's configuration dialog is currently waiting on.
/// Idle is the absence of an entry in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    AwaitingToken,
    AwaitingUser,
    AwaitingRepo,
    ConfirmCreateRepo,
}

/// Network action the caller must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Check repository reachability, then feed the result back through
    /// [`SessionStore::on_probe_result`].
    ProbeRepo,
    /// Issue the repository creation request.
    CreateRepo,
}

/// Result of the reachability probe issued after the repo name was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found,
    Missing,
    /// The probe itself failed; the config is kept as entered.
    Unknown,
}

#[derive(Debug, Default)]
pub struct Advance {
    pub messages: Vec<String>,
    pub follow_up: Option<FollowUp>,
}

/// Owns the live user-id to stage mapping. Touched only from the single
/// control task, so no synchronization is needed.
#[derive(Debug, Default)]
pub struct SessionStore {
    stages: HashMap<String, SessionStage>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, user_id: &str) -> bool {
        self.stages.contains_key(user_id)
    }

    pub fn stage(&self, user_id: &str) -> Option<SessionStage> {
        self.stages.get(user_id).copied()
    }

    /// Open a configuration dialog. The caller has already checked admin
    /// rights.
    pub fn begin(&mut self, user_id: &str) -> String {
        debug!(user_id, "configuration dialog opened");
        self.stages
            .insert(user_id.to_string(), SessionStage::AwaitingToken);
        "🔑 Send GitHub token:".to_string()
    }

    /// Feed one free-text message into the user's active dialog. A user
    /// without an active session gets an empty advance.
    pub fn advance(
        &mut self,
        user_id: &str,
        text: &str,
        config: &mut ConfigStore,
    ) -> anyhow::Result<Advance> {
        let Some(stage) = self.stages.get(user_id).copied() else {
            return Ok(Advance::default());
        };

        let mut advance = Advance::default();
        match stage {
            SessionStage::AwaitingToken => {
                config.set_github_token(text)?;
                self.stages
                    .insert(user_id.to_string(), SessionStage::AwaitingUser);
                advance.messages.push("✅ Token saved!".to_string());
                advance
                    .messages
                    .push("👤 Send GitHub username:".to_string());
            }
            SessionStage::AwaitingUser => {
                config.set_github_user(text)?;
                self.stages
                    .insert(user_id.to_string(), SessionStage::AwaitingRepo);
                advance.messages.push("✅ Username saved!".to_string());
                advance
                    .messages
                    .push("📁 Send repository name:".to_string());
            }
            SessionStage::AwaitingRepo => {
                config.set_repo_name(text)?;
                self.stages.remove(user_id);
                advance.follow_up = Some(FollowUp::ProbeRepo);
            }
            SessionStage::ConfirmCreateRepo => {
                self.stages.remove(user_id);
                if text.trim().eq_ignore_ascii_case("yes") {
                    advance.messages.push("Creating repository...".to_string());
                    advance.follow_up = Some(FollowUp::CreateRepo);
                } else {
                    advance
                        .messages
                        .push("⚠️ Repository not created".to_string());
                }
            }
        }
        Ok(advance)
    }

    /// Resolve the reachability probe. Only a missing repository reopens the
    /// dialog, asking for creation confirmation.
    pub fn on_probe_result(&mut self, user_id: &str, outcome: ProbeOutcome) -> String {
        match outcome {
            ProbeOutcome::Found => "✅ Config saved! Repository accessible.".to_string(),
            ProbeOutcome::Missing => {
                self.stages
                    .insert(user_id.to_string(), SessionStage::ConfirmCreateRepo);
                "⚠️ Repo not found. Create it? (yes/no)".to_string()
            }
            ProbeOutcome::Unknown => "✅ Config saved!".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::load(dir.path().join("config.json")).unwrap()
    }

    #[test]
    fn test_token_and_user_steps_store_values_in_order() {
        let dir = tempdir().unwrap();
        let mut config = config_in(&dir);
        let mut sessions = SessionStore::new();

        sessions.begin("u1");
        assert_eq!(sessions.stage("u1"), Some(SessionStage::AwaitingToken));

        let adv = sessions.advance("u1", "ghp_secret", &mut config).unwrap();
        assert!(adv.follow_up.is_none());
        assert_eq!(config.config().github_token, "ghp_secret");
        assert_eq!(sessions.stage("u1"), Some(SessionStage::AwaitingUser));

        sessions.advance("u1", "octocat", &mut config).unwrap();
        assert_eq!(config.config().github_user, "octocat");
        assert_eq!(sessions.stage("u1"), Some(SessionStage::AwaitingRepo));
    }

    #[test]
    fn test_repo_step_requests_probe_and_closes_session() {
        let dir = tempdir().unwrap();
        let mut config = config_in(&dir);
        let mut sessions = SessionStore::new();
        sessions.begin("u1");
        sessions.advance("u1", "tok", &mut config).unwrap();
        sessions.advance("u1", "owner", &mut config).unwrap();

        let adv = sessions.advance("u1", "myrepo", &mut config).unwrap();
        assert_eq!(adv.follow_up, Some(FollowUp::ProbeRepo));
        assert_eq!(config.config().repo_name, "myrepo");
        assert!(!sessions.is_active("u1"));
    }

    #[test]
    fn test_probe_found_leaves_dialog_closed() {
        let mut sessions = SessionStore::new();
        let reply = sessions.on_probe_result("u1", ProbeOutcome::Found);
        assert!(reply.contains("accessible"));
        assert!(!sessions.is_active("u1"));
    }

    #[test]
    fn test_probe_missing_asks_for_creation_confirmation() {
        let mut sessions = SessionStore::new();
        sessions.on_probe_result("u1", ProbeOutcome::Missing);
        assert_eq!(sessions.stage("u1"), Some(SessionStage::ConfirmCreateRepo));
    }

    #[test]
    fn test_confirmation_yes_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let mut config = config_in(&dir);
        let mut sessions = SessionStore::new();
        sessions.on_probe_result("u1", ProbeOutcome::Missing);

        let adv = sessions.advance("u1", "YES", &mut config).unwrap();
        assert_eq!(adv.follow_up, Some(FollowUp::CreateRepo));
        assert!(!sessions.is_active("u1"));
    }

    #[test]
    fn test_confirmation_declined_closes_without_action() {
        let dir = tempdir().unwrap();
        let mut config = config_in(&dir);
        let mut sessions = SessionStore::new();
        sessions.on_probe_result("u1", ProbeOutcome::Missing);

        let adv = sessions.advance("u1", "nope", &mut config).unwrap();
        assert!(adv.follow_up.is_none());
        assert!(adv.messages[0].contains("not created"));
        assert!(!sessions.is_active("u1"));
    }

    #[test]
    fn test_free_text_without_session_is_a_no_op() {
        let dir = tempdir().unwrap();
        let mut config = config_in(&dir);
        let mut sessions = SessionStore::new();

        let adv = sessions.advance("u1", "hello", &mut config).unwrap();
        assert!(adv.messages.is_empty());
        assert!(adv.follow_up.is_none());
        assert!(config.config().github_token.is_empty());
    }
}
