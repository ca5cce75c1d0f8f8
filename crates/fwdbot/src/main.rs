use std::sync::Arc;

use fwdbot_core::{auth::AuthorizationGate, config::Config, registry::ChatRegistry};

#[tokio::main]
async fn main() -> Result<(), fwdbot_core::Error> {
    fwdbot_core::logging::init("fwdbot")?;

    let cfg = Arc::new(Config::load()?);

    // A corrupt or unreadable store degrades to an empty registry; it will be
    // rewritten on the next successful mutation.
    let registry = match ChatRegistry::load(&cfg.target_chats_file, cfg.max_target_chats) {
        Ok(reg) => reg,
        Err(err) => {
            tracing::warn!(%err, "could not load persisted target chats; starting empty");
            ChatRegistry::new(cfg.target_chats_file.clone(), cfg.max_target_chats)
        }
    };
    let registry = Arc::new(registry);
    let gate = AuthorizationGate::new(cfg.authorized_user_ids.iter().copied());

    fwdbot_telegram::router::run_polling(cfg, registry, gate)
        .await
        .map_err(|e| fwdbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
