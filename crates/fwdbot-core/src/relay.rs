use std::{sync::Arc, time::Duration};

use tokio::{task::JoinSet, time::timeout};
use tracing::{debug, error, info, warn};

use crate::{
    domain::{ChatId, MessageId},
    messaging::port::{MessagingPort, SendError},
    registry::ChatRegistry,
};

/// A post in the source channel, identified well enough to forward.
#[derive(Clone, Copy, Debug)]
pub struct SourcePost {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Aggregate result of one fan-out pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    pub delivered: usize,
    pub failed: usize,
    /// Destinations found permanently unreachable and pruned in this pass.
    pub removed: Vec<ChatId>,
}

/// Forwards each source-channel post to every registered destination and
/// prunes destinations the platform reports as gone.
pub struct RelayEngine {
    registry: Arc<ChatRegistry>,
    messenger: Arc<dyn MessagingPort>,
    send_timeout: Duration,
}

impl RelayEngine {
    pub fn new(
        registry: Arc<ChatRegistry>,
        messenger: Arc<dyn MessagingPort>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            messenger,
            send_timeout,
        }
    }

    /// Fan one post out to every destination in a registry snapshot.
    ///
    /// Forwards run concurrently, each bounded by the send timeout; the pass
    /// waits for all of them to settle before reconciling the registry, and
    /// one destination's failure never blocks delivery to the rest. Pruning
    /// is a single batch with a single persist.
    pub async fn relay(&self, post: SourcePost) -> RelayOutcome {
        let targets = self.registry.snapshot();
        if targets.is_empty() {
            debug!("no target chats registered; nothing to relay");
            return RelayOutcome::default();
        }

        info!(
            targets = targets.len(),
            message_id = post.message_id.0,
            "relaying channel post"
        );

        let mut tasks = JoinSet::new();
        for dest in targets {
            let messenger = self.messenger.clone();
            let limit = self.send_timeout;
            tasks.spawn(async move {
                let res = match timeout(limit, messenger.forward(dest, post.chat_id, post.message_id))
                    .await
                {
                    Ok(res) => res.map(|_| ()),
                    Err(_) => Err(SendError::Other("forward timed out".to_string())),
                };
                (dest, res)
            });
        }

        let mut outcome = RelayOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            let Ok((dest, res)) = joined else {
                // A panicked forward task counts as one failed delivery.
                outcome.failed += 1;
                continue;
            };
            match res {
                Ok(()) => outcome.delivered += 1,
                Err(err) if is_permanent(&err) => {
                    outcome.failed += 1;
                    warn!(chat_id = dest.0, %err, "destination unreachable; scheduling removal");
                    outcome.removed.push(dest);
                }
                Err(err) => {
                    outcome.failed += 1;
                    warn!(chat_id = dest.0, %err, "forward failed; keeping destination");
                }
            }
        }

        if !outcome.removed.is_empty() {
            match self.registry.remove_all(&outcome.removed) {
                Ok(dropped) => info!(dropped, "pruned unreachable target chats"),
                Err(err) => {
                    error!(%err, "failed to persist pruned target list; memory is ahead of disk")
                }
            }
        }

        info!(
            delivered = outcome.delivered,
            failed = outcome.failed,
            removed = outcome.removed.len(),
            "relay pass complete"
        );
        outcome
    }
}

/// `Forbidden` (blocked/kicked) and `NotFound` both mean the destination is
/// gone for good. Telegram reports "chat not found" as an HTTP 400, so the
/// adapter's classification, not the status code, decides permanence.
fn is_permanent(err: &SendError) -> bool {
    matches!(err, SendError::Forbidden | SendError::NotFound)
}
