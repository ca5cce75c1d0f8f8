use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    auth::AuthorizationGate,
    commands::{parse_command, Command, CommandRouter},
    config::Config,
    domain::{ChatId, MessageId},
    messaging::{
        port::MessagingPort,
        types::{InboundEvent, InboundMessage},
    },
    registry::{ChatRegistry, RemoveOutcome},
    relay::{RelayEngine, SourcePost},
};

/// Routes inbound events to the relay engine or the command router.
///
/// One logical worker drives this, one event at a time; a failure while
/// handling an event is logged and never escapes to the caller.
pub struct EventDispatcher {
    cfg: Arc<Config>,
    registry: Arc<ChatRegistry>,
    relay: RelayEngine,
    router: CommandRouter,
    messenger: Arc<dyn MessagingPort>,
}

impl EventDispatcher {
    pub fn new(
        cfg: Arc<Config>,
        registry: Arc<ChatRegistry>,
        gate: AuthorizationGate,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        let relay = RelayEngine::new(registry.clone(), messenger.clone(), cfg.send_timeout);
        let router = CommandRouter::new(cfg.clone(), registry.clone(), gate, messenger.clone());
        Self {
            cfg,
            registry,
            relay,
            router,
            messenger,
        }
    }

    pub async fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::ChannelPost(post) => {
                self.maybe_relay(post.chat_id, post.message_id).await;
            }
            InboundEvent::Message(msg) => {
                // Regular messages in the source channel's discussion flow
                // also trigger the relay, matching channel posts.
                if self.is_source(msg.chat_id) {
                    self.maybe_relay(msg.chat_id, msg.message_id).await;
                    return;
                }
                self.handle_chat_message(msg).await;
            }
            InboundEvent::BotMembership(change) => {
                if change.present {
                    return;
                }
                match self.registry.remove(change.chat_id) {
                    Ok(RemoveOutcome::Removed) => {
                        info!(chat_id = change.chat_id.0, "bot removed from chat; target evicted")
                    }
                    Ok(RemoveOutcome::NotPresent) => {}
                    Err(err) => warn!(%err, "failed to persist eviction"),
                }
            }
        }
    }

    async fn handle_chat_message(&self, msg: InboundMessage) {
        if !msg.chat_kind.accepts_commands() {
            return;
        }
        let Some(text) = msg.text.as_deref() else {
            return;
        };
        if !text.trim_start().starts_with('/') {
            debug!(chat_id = msg.chat_id.0, "ignoring non-command text");
            return;
        }

        let (name, args) = parse_command(text);
        let cmd = Command {
            chat_id: msg.chat_id,
            chat_kind: msg.chat_kind,
            chat_title: msg.chat_title,
            from_user_id: msg.from_user_id,
            name,
            args,
        };

        for reply in self.router.handle(&cmd).await {
            if let Err(err) = self.messenger.send_text(cmd.chat_id, &reply).await {
                warn!(chat_id = cmd.chat_id.0, %err, "failed to send reply");
            }
        }
    }

    async fn maybe_relay(&self, chat_id: ChatId, message_id: MessageId) {
        if !self.is_source(chat_id) {
            debug!(chat_id = chat_id.0, "post from an unconfigured channel; ignoring");
            return;
        }
        self.relay
            .relay(SourcePost {
                chat_id,
                message_id,
            })
            .await;
    }

    fn is_source(&self, chat_id: ChatId) -> bool {
        self.cfg.source_channel_id == Some(chat_id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::testing::ScriptedMessenger;
    use crate::messaging::types::{ChannelPost, ChatKind, MembershipChange};
    use std::{path::PathBuf, time::Duration};

    fn scratch_path(name: &str) -> PathBuf {
        PathBuf::from(format!(
            "/tmp/fwdbot-dispatch-{}-{name}.json",
            std::process::id()
        ))
    }

    fn make_dispatcher(
        name: &str,
        source: Option<i64>,
        targets: &[i64],
    ) -> (EventDispatcher, Arc<ChatRegistry>, Arc<ScriptedMessenger>, PathBuf) {
        let path = scratch_path(name);
        let _ = std::fs::remove_file(&path);
        let cfg = Arc::new(Config {
            bot_token: "token".to_string(),
            source_channel_id: source,
            authorized_user_ids: Vec::new(),
            max_target_chats: 100,
            target_chats_file: path.clone(),
            send_timeout: Duration::from_secs(5),
        });
        let registry = Arc::new(ChatRegistry::new(&path, cfg.max_target_chats));
        for &id in targets {
            registry.add(ChatId(id)).unwrap();
        }
        let messenger = Arc::new(ScriptedMessenger::default());
        let dispatcher = EventDispatcher::new(
            cfg,
            registry.clone(),
            AuthorizationGate::new([]),
            messenger.clone(),
        );
        (dispatcher, registry, messenger, path)
    }

    fn channel_post(chat: i64) -> InboundEvent {
        InboundEvent::ChannelPost(ChannelPost {
            chat_id: ChatId(chat),
            message_id: MessageId(7),
        })
    }

    fn text_message(chat: i64, text: &str) -> InboundEvent {
        InboundEvent::Message(InboundMessage {
            chat_id: ChatId(chat),
            chat_kind: ChatKind::Private,
            chat_title: None,
            from_user_id: Some(crate::domain::UserId(1)),
            message_id: MessageId(8),
            text: Some(text.to_string()),
        })
    }

    #[tokio::test]
    async fn source_channel_post_fans_out() {
        let (dispatcher, _registry, messenger, path) =
            make_dispatcher("relay", Some(-100), &[1, 2]);

        dispatcher.dispatch(channel_post(-100)).await;

        assert_eq!(messenger.forward_count(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn foreign_channel_post_is_ignored() {
        let (dispatcher, _registry, messenger, path) =
            make_dispatcher("foreign", Some(-100), &[1, 2]);

        dispatcher.dispatch(channel_post(-200)).await;

        assert_eq!(messenger.forward_count(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn relay_stays_inactive_without_source_channel() {
        let (dispatcher, _registry, messenger, path) =
            make_dispatcher("inactive", None, &[1]);

        dispatcher.dispatch(channel_post(-100)).await;

        assert_eq!(messenger.forward_count(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn source_message_event_also_relays() {
        let (dispatcher, _registry, messenger, path) =
            make_dispatcher("src-msg", Some(-100), &[1]);

        let mut msg = text_message(-100, "anything");
        if let InboundEvent::Message(ref mut m) = msg {
            m.chat_kind = ChatKind::Channel;
        }
        dispatcher.dispatch(msg).await;

        assert_eq!(messenger.forward_count(), 1);
        assert!(messenger.sent_texts().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn command_message_gets_a_reply() {
        let (dispatcher, _registry, messenger, path) =
            make_dispatcher("cmd", Some(-100), &[]);

        dispatcher.dispatch(text_message(42, "/start")).await;

        let sent = messenger.sent_texts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert!(sent[0].1.contains("Welcome"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn plain_text_is_ignored() {
        let (dispatcher, _registry, messenger, path) =
            make_dispatcher("plain", Some(-100), &[]);

        dispatcher.dispatch(text_message(42, "hello there")).await;

        assert!(messenger.sent_texts().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn eviction_removes_registered_chat() {
        let (dispatcher, registry, _messenger, path) =
            make_dispatcher("evict", Some(-100), &[1, 2]);

        dispatcher
            .dispatch(InboundEvent::BotMembership(MembershipChange {
                chat_id: ChatId(2),
                present: false,
            }))
            .await;

        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(ChatId(2)));

        // Re-joining does not auto-register.
        dispatcher
            .dispatch(InboundEvent::BotMembership(MembershipChange {
                chat_id: ChatId(2),
                present: true,
            }))
            .await;
        assert_eq!(registry.len(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
