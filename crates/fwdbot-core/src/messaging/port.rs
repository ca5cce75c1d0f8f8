use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::ChatInfo,
};

/// Classified outcome of a failed outbound Bot API call.
///
/// `Forbidden` (bot blocked or kicked) and `NotFound` mark a destination as
/// permanently unreachable; everything else is treated as transient by the
/// relay engine and leaves the destination registered.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("forbidden: bot was blocked or removed from the chat")]
    Forbidden,

    #[error("chat not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("send failed: {0}")]
    Other(String),
}

/// Hexagonal port for the bot-protocol binding.
///
/// Telegram is the first implementation; the shape is kept narrow so other
/// messengers could fit behind the same interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef, SendError>;

    /// Re-deliver an existing message via the platform's native forward
    /// mechanism (distinct from sending new text).
    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageRef, SendError>;

    /// Chat metadata, used for display in `/list` and `/status` only.
    async fn get_chat_info(&self, chat_id: ChatId) -> Result<ChatInfo, SendError>;
}
