use std::sync::Arc;

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    prelude::*,
    types::{Chat, ChatMemberKind, ChatMemberUpdated},
};

use tracing::{info, warn};

use fwdbot_core::{
    auth::AuthorizationGate,
    config::Config,
    dispatch::EventDispatcher,
    domain::{ChatId, MessageId, UserId},
    messaging::{
        port::MessagingPort,
        types::{ChannelPost, ChatKind, InboundEvent, InboundMessage, MembershipChange},
    },
    registry::ChatRegistry,
};

use crate::TelegramMessenger;

/// Run the long-polling loop until the process is stopped.
pub async fn run_polling(
    cfg: Arc<Config>,
    registry: Arc<ChatRegistry>,
    gate: AuthorizationGate,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    // Startup summary.
    match bot.get_me().await {
        Ok(me) => info!(username = me.username(), "bot started"),
        Err(e) => warn!(error = %e, "could not fetch bot identity"),
    }
    match cfg.source_channel_id {
        Some(id) => info!(channel = id, "relaying posts from source channel"),
        None => warn!("no source channel configured; relay inactive"),
    }
    info!(
        targets = registry.len(),
        authorized_users = gate.users().len(),
        "registry loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let dispatcher = Arc::new(EventDispatcher::new(cfg, registry, gate, messenger));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_channel_post().endpoint(handle_channel_post))
        .branch(Update::filter_my_chat_member().endpoint(handle_my_chat_member));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, dispatcher: Arc<EventDispatcher>) -> ResponseResult<()> {
    dispatcher
        .dispatch(InboundEvent::Message(to_inbound_message(&msg)))
        .await;
    Ok(())
}

async fn handle_channel_post(post: Message, dispatcher: Arc<EventDispatcher>) -> ResponseResult<()> {
    dispatcher
        .dispatch(InboundEvent::ChannelPost(ChannelPost {
            chat_id: ChatId(post.chat.id.0),
            message_id: MessageId(post.id.0),
        }))
        .await;
    Ok(())
}

async fn handle_my_chat_member(
    upd: ChatMemberUpdated,
    dispatcher: Arc<EventDispatcher>,
) -> ResponseResult<()> {
    let present = !matches!(
        upd.new_chat_member.kind,
        ChatMemberKind::Left | ChatMemberKind::Banned(_)
    );
    dispatcher
        .dispatch(InboundEvent::BotMembership(MembershipChange {
            chat_id: ChatId(upd.chat.id.0),
            present,
        }))
        .await;
    Ok(())
}

fn to_inbound_message(msg: &Message) -> InboundMessage {
    InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        chat_kind: chat_kind(&msg.chat),
        chat_title: msg
            .chat
            .title()
            .map(str::to_string)
            .or_else(|| msg.chat.username().map(str::to_string)),
        from_user_id: msg.from().map(|u| UserId(u.id.0 as i64)),
        message_id: MessageId(msg.id.0),
        text: msg.text().map(str::to_string),
    }
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_channel() {
        ChatKind::Channel
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Private
    }
}
