use crate::domain::{ChatId, MessageId, UserId};

/// What kind of chat an update came from. Commands are only honored from
/// private chats and groups; channel posts go through the relay path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        }
    }

    pub fn accepts_commands(&self) -> bool {
        matches!(self, ChatKind::Private | ChatKind::Group | ChatKind::Supergroup)
    }
}

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    Message(InboundMessage),
    ChannelPost(ChannelPost),
    BotMembership(MembershipChange),
}

#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub chat_title: Option<String>,
    pub from_user_id: Option<UserId>,
    pub message_id: MessageId,
    pub text: Option<String>,
}

/// A post published in a channel the bot can read.
#[derive(Clone, Copy, Debug)]
pub struct ChannelPost {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// The bot's own membership in a chat changed (added, kicked, banned).
#[derive(Clone, Copy, Debug)]
pub struct MembershipChange {
    pub chat_id: ChatId,
    pub present: bool,
}

/// Minimal chat metadata used for display in `/list` and `/status`.
#[derive(Clone, Debug, Default)]
pub struct ChatInfo {
    pub title: Option<String>,
    pub username: Option<String>,
}

impl ChatInfo {
    pub fn display_name(&self) -> Option<&str> {
        self.title.as_deref().or(self.username.as_deref())
    }
}
