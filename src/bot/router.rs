// ABOUTME: Command parsing and network-free dispatch
// Text is parsed once into a tagged command; operations that need the remote
// store come back as effects for the bot to execute.

use tracing::warn;

use super::session::SessionStore;
use crate::config::ConfigStore;

pub const ACCESS_DENIED: &str = "❌ Access denied!";
pub const ADMIN_ONLY: &str = "❌ Admin only!";

const WELCOME: &str = "🤖 Gitdrop\n\n\
📤 Features:\n\
• Upload any file\n\
• Auto extract ZIP archives\n\
• Multi-user support\n\
• GitHub push\n\n\
📝 Commands:\n\
/start - Start bot\n\
/setconfig - Set GitHub config\n\
/list - List repository files\n\
/users - Manage users (admin)\n\
/help - Show help";

const HELP: &str = "❓ Help:\n\n\
For admins:\n\
/setconfig - Set GitHub config\n\
/users - List allowed users\n\
/adduser <id> - Add user\n\
/removeuser <id> - Remove user\n\n\
For users:\n\
Just send any file or ZIP!\n\
/list - View repository files";

/// The fixed command surface, parsed from a message prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    SetConfig,
    List,
    Users,
    AddUser(Option<String>),
    RemoveUser(Option<String>),
    Help,
}

impl Command {
    /// Case-sensitive prefix match; anything unrecognized falls through to
    /// the session dialog (or is ignored).
    pub fn parse(text: &str) -> Option<Self> {
        if text.starts_with("/start") {
            Some(Command::Start)
        } else if text.starts_with("/setconfig") {
            Some(Command::SetConfig)
        } else if text.starts_with("/list") {
            Some(Command::List)
        } else if text.starts_with("/users") {
            Some(Command::Users)
        } else if text.starts_with("/adduser") {
            Some(Command::AddUser(argument(text)))
        } else if text.starts_with("/removeuser") {
            Some(Command::RemoveUser(argument(text)))
        } else if text.starts_with("/help") {
            Some(Command::Help)
        } else {
            None
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::SetConfig | Command::Users | Command::AddUser(_) | Command::RemoveUser(_)
        )
    }
}

fn argument(text: &str) -> Option<String> {
    text.split_whitespace().nth(1).map(str::to_string)
}

/// Remote-store operation the bot must run after the dispatch replies are
/// sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    ListFiles,
}

#[derive(Debug, Default)]
pub struct CommandReply {
    pub messages: Vec<String>,
    pub effect: Option<CommandEffect>,
}

impl CommandReply {
    fn message(text: impl Into<String>) -> Self {
        Self {
            messages: vec![text.into()],
            effect: None,
        }
    }
}

/// Handle one parsed command. Pure apart from config persistence, so the
/// whole command surface is testable without a network.
pub fn dispatch(
    command: &Command,
    user_id: &str,
    config: &mut ConfigStore,
    sessions: &mut SessionStore,
) -> CommandReply {
    if command.requires_admin() && !config.config().is_admin(user_id) {
        return CommandReply::message(ADMIN_ONLY);
    }

    match command {
        Command::Start => CommandReply::message(WELCOME),
        Command::Help => CommandReply::message(HELP),
        Command::SetConfig => CommandReply::message(sessions.begin(user_id)),
        Command::List => CommandReply {
            messages: vec!["🔄 Fetching files...".to_string()],
            effect: Some(CommandEffect::ListFiles),
        },
        Command::Users => {
            let users = &config.config().allowed_users;
            if users.is_empty() {
                CommandReply::message("📭 No allowed users")
            } else {
                let list = users
                    .iter()
                    .map(|u| format!("👤 {u}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                CommandReply::message(format!("👥 Allowed users:\n{list}"))
            }
        }
        Command::AddUser(argument) => match argument {
            Some(id) => match config.add_allowed_user(id) {
                Ok(()) => CommandReply::message(format!("✅ User {id} added")),
                Err(e) => {
                    warn!("failed to persist config: {e:#}");
                    CommandReply::message("❌ Failed to save config")
                }
            },
            None => CommandReply::message("Usage: /adduser <id>"),
        },
        Command::RemoveUser(argument) => match argument {
            Some(id) => match config.remove_allowed_user(id) {
                Ok(()) => CommandReply::message(format!("🗑️ User {id} removed")),
                Err(e) => {
                    warn!("failed to persist config: {e:#}");
                    CommandReply::message("❌ Failed to save config")
                }
            },
            None => CommandReply::message("Usage: /removeuser <id>"),
        },
    }
}
