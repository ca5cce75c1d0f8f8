//! Telegram adapter (teloxide).
//!
//! Implements the `fwdbot-core` messaging port over the Telegram Bot API and
//! maps API failures into the core's classified `SendError`.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod router;

use fwdbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::{
        port::{MessagingPort, SendError},
        types::ChatInfo,
    },
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T, SendError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        // One bounded retry on rate limiting; every other failure surfaces
        // immediately with its classification.
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(classify(other)),
                },
            }
        }
    }
}

/// Map a teloxide failure into the relay's classification.
///
/// "Chat not found" arrives as an HTTP 400 from Telegram, so only the API
/// error kind is trusted here, never the status code.
fn classify(e: teloxide::RequestError) -> SendError {
    use teloxide::{ApiError, RequestError};
    match e {
        RequestError::Api(api) => match api {
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::UserDeactivated
            | ApiError::CantInitiateConversation
            | ApiError::CantTalkWithBots => SendError::Forbidden,
            ApiError::ChatNotFound | ApiError::UserNotFound | ApiError::GroupDeactivated => {
                SendError::NotFound
            }
            other => SendError::BadRequest(other.to_string()),
        },
        other => SendError::Other(other.to_string()),
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef, SendError> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageRef, SendError> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .forward_message(Self::tg_chat(to), Self::tg_chat(from), Self::tg_msg_id(message_id))
            })
            .await?;

        Ok(MessageRef {
            chat_id: to,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn get_chat_info(&self, chat_id: ChatId) -> Result<ChatInfo, SendError> {
        let chat = self
            .with_retry(|| self.bot.get_chat(Self::tg_chat(chat_id)))
            .await?;

        Ok(ChatInfo {
            title: chat.title().map(str::to_string),
            username: chat.username().map(str::to_string),
        })
    }
}
