//! Scripted in-memory messenger for core tests.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::domain::{ChatId, MessageId, MessageRef};
use crate::messaging::{
    port::{MessagingPort, SendError},
    types::ChatInfo,
};

/// Test double: records every outbound call and fails on demand.
#[derive(Default)]
pub(crate) struct ScriptedMessenger {
    /// Per-chat failure to return from `forward`.
    pub fail_forward: Mutex<HashMap<i64, SendError>>,
    /// Per-chat failure to return from `send_text`.
    pub fail_send: Mutex<HashMap<i64, SendError>>,
    /// Titles served by `get_chat_info`; unlisted chats yield `NotFound`.
    pub titles: Mutex<HashMap<i64, String>>,

    /// Recorded `forward` calls as (destination, source, message id).
    pub forwards: Mutex<Vec<(i64, i64, i32)>>,
    /// Recorded `send_text` calls as (chat, text).
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl ScriptedMessenger {
    pub fn fail_forward_with(&self, chat: i64, err: SendError) {
        self.fail_forward.lock().unwrap().insert(chat, err);
    }

    pub fn set_title(&self, chat: i64, title: &str) {
        self.titles.lock().unwrap().insert(chat, title.to_string());
    }

    pub fn forward_count(&self) -> usize {
        self.forwards.lock().unwrap().len()
    }

    pub fn sent_texts(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for ScriptedMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef, SendError> {
        if let Some(err) = self.fail_send.lock().unwrap().get(&chat_id.0) {
            return Err(err.clone());
        }
        self.sent.lock().unwrap().push((chat_id.0, text.to_string()));
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(1),
        })
    }

    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageRef, SendError> {
        if let Some(err) = self.fail_forward.lock().unwrap().get(&to.0) {
            return Err(err.clone());
        }
        self.forwards
            .lock()
            .unwrap()
            .push((to.0, from.0, message_id.0));
        Ok(MessageRef {
            chat_id: to,
            message_id,
        })
    }

    async fn get_chat_info(&self, chat_id: ChatId) -> Result<ChatInfo, SendError> {
        match self.titles.lock().unwrap().get(&chat_id.0) {
            Some(title) => Ok(ChatInfo {
                title: Some(title.clone()),
                username: None,
            }),
            None => Err(SendError::NotFound),
        }
    }
}
