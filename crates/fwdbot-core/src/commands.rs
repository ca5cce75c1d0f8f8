use std::sync::Arc;

use tracing::error;

use crate::{
    auth::AuthorizationGate,
    config::Config,
    domain::{ChatId, UserId},
    messaging::{port::MessagingPort, types::ChatKind},
    registry::{AddOutcome, ChatRegistry, RemoveOutcome},
};

const WELCOME: &str = "\
Welcome to the message forwarding bot.

This bot forwards posts from a notification channel to every registered \
target chat.

Send /add in a chat to register it as a target, /remove to unregister it, \
and /help for the full command list.";

const DENIED: &str = "You are not authorized to use this command.";

const UNKNOWN: &str = "Unknown command. Send /help for available commands.";

const AUTH_USAGE: &str = "Usage: /auth list";

/// A parsed command plus the identity of its caller.
#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub chat_title: Option<String>,
    pub from_user_id: Option<UserId>,
    pub name: String,
    pub args: String,
}

impl Command {
    fn chat_label(&self) -> &str {
        self.chat_title.as_deref().unwrap_or("This chat")
    }
}

/// Split raw text into a command name and its argument tail.
///
/// The name is the first whitespace-delimited token, matched case-sensitively
/// with the leading `/` dropped. Telegram appends `@botname` in group chats;
/// that suffix is not part of the name.
pub fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let name = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_string();

    (name, rest)
}

/// Maps a command plus caller identity to replies and registry mutations.
///
/// Stateless between invocations: everything is read fresh from the registry,
/// the gate, and the config on each call.
pub struct CommandRouter {
    cfg: Arc<Config>,
    registry: Arc<ChatRegistry>,
    gate: AuthorizationGate,
    messenger: Arc<dyn MessagingPort>,
}

impl CommandRouter {
    pub fn new(
        cfg: Arc<Config>,
        registry: Arc<ChatRegistry>,
        gate: AuthorizationGate,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            cfg,
            registry,
            gate,
            messenger,
        }
    }

    /// Produce the replies for one command. Each returned string is sent as
    /// its own message; every command yields at least one reply.
    pub async fn handle(&self, cmd: &Command) -> Vec<String> {
        let authorized = self.gate.is_authorized(cmd.from_user_id);

        match cmd.name.as_str() {
            "start" => vec![WELCOME.to_string()],
            "help" => vec![help_text()],
            "test" => self.test_replies(cmd, authorized),
            "add" | "remove" | "list" | "status" | "auth" if !authorized => {
                vec![DENIED.to_string()]
            }
            "add" => self.add(cmd),
            "remove" => self.remove(cmd),
            "list" => self.list().await,
            "status" => self.status().await,
            "auth" => self.auth(cmd),
            _ => vec![UNKNOWN.to_string()],
        }
    }

    fn add(&self, cmd: &Command) -> Vec<String> {
        match self.registry.add(cmd.chat_id) {
            Ok(AddOutcome::Added) => {
                vec![format!(
                    "{} has been added to the target list.",
                    cmd.chat_label()
                )]
            }
            Ok(AddOutcome::AlreadyPresent) => {
                vec!["This chat is already in the target list.".to_string()]
            }
            Ok(AddOutcome::LimitReached) => {
                vec![format!(
                    "Target list is full ({} chats max).",
                    self.registry.max_chats()
                )]
            }
            Err(err) => {
                error!(%err, "failed to persist target list after add");
                vec![
                    "Chat was added, but saving the target list failed; the change may not survive a restart."
                        .to_string(),
                ]
            }
        }
    }

    fn remove(&self, cmd: &Command) -> Vec<String> {
        match self.registry.remove(cmd.chat_id) {
            Ok(RemoveOutcome::Removed) => {
                vec![format!(
                    "{} has been removed from the target list.",
                    cmd.chat_label()
                )]
            }
            Ok(RemoveOutcome::NotPresent) => {
                vec!["This chat is not in the target list.".to_string()]
            }
            Err(err) => {
                error!(%err, "failed to persist target list after remove");
                vec![
                    "Chat was removed, but saving the target list failed; the change may not survive a restart."
                        .to_string(),
                ]
            }
        }
    }

    async fn list(&self) -> Vec<String> {
        let chats = self.registry.snapshot();
        if chats.is_empty() {
            return vec!["No target chats configured.".to_string()];
        }

        let mut lines = vec![format!("Target chats ({}):", chats.len())];
        for id in chats {
            let label = match self.messenger.get_chat_info(id).await {
                Ok(info) => info
                    .display_name()
                    .unwrap_or("unknown")
                    .to_string(),
                Err(_) => "unknown".to_string(),
            };
            lines.push(format!("- {label} ({id})"));
        }
        vec![lines.join("\n")]
    }

    async fn status(&self) -> Vec<String> {
        let channel = match self.cfg.source_channel_id {
            Some(id) => {
                let id = ChatId(id);
                match self.messenger.get_chat_info(id).await {
                    Ok(info) => {
                        format!("{} ({id})", info.display_name().unwrap_or("unknown"))
                    }
                    Err(_) => format!("{id} (no info available)"),
                }
            }
            None => "not configured".to_string(),
        };

        let users = if self.gate.is_open() {
            "0 (open access)".to_string()
        } else {
            self.gate.users().len().to_string()
        };

        vec![format!(
            "Bot status:\n- Target chats: {}/{}\n- Source channel: {}\n- Authorized users: {}",
            self.registry.len(),
            self.registry.max_chats(),
            channel,
            users,
        )]
    }

    fn auth(&self, cmd: &Command) -> Vec<String> {
        if cmd.args != "list" {
            return vec![AUTH_USAGE.to_string()];
        }

        if self.gate.is_open() {
            vec![
                "No authorized users configured; every user may run admin commands.".to_string(),
                "Set AUTHORIZED_USERS in the environment and restart the bot to restrict access."
                    .to_string(),
            ]
        } else {
            let users = self
                .gate
                .users()
                .iter()
                .map(|u| format!("- {u}"))
                .collect::<Vec<_>>()
                .join("\n");
            vec![
                format!("Authorized users ({}):\n{}", self.gate.users().len(), users),
                "Edit AUTHORIZED_USERS in the environment and restart the bot to change this list."
                    .to_string(),
            ]
        }
    }

    fn test_replies(&self, cmd: &Command, authorized: bool) -> Vec<String> {
        vec![
            "The bot can send messages to this chat.".to_string(),
            format!("Chat id: {}", cmd.chat_id),
            format!("Chat type: {}", cmd.chat_kind.as_str()),
            format!(
                "Your id: {}",
                cmd.from_user_id
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
            format!("Authorized: {}", if authorized { "yes" } else { "no" }),
        ]
    }
}

fn help_text() -> String {
    "Message forwarding bot commands:

/start - Welcome message
/test - Echo chat and caller details
/help - This message

Admin commands (authorized users only):
/add - Register this chat as a forwarding target
/remove - Unregister this chat
/list - Show all target chats
/status - Show registry size, source channel, and authorized users
/auth list - Show the authorized user list

Posts in the configured notification channel are forwarded to every target \
chat automatically. If no authorized users are configured, every user may \
run admin commands."
        .to_string()
}
