use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::warn;

use crate::{errors::Error, Result};

/// Typed configuration for the relay bot.
///
/// Values come from the environment; a local `.env` file is honored without
/// overriding variables that are already set.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,

    /// The only channel whose posts are relayed. When unset the relay stays
    /// inactive and only commands work.
    pub source_channel_id: Option<i64>,

    /// Users allowed to run mutating commands. An EMPTY list authorizes every
    /// user (backward-compatible default; see `AuthorizationGate`).
    pub authorized_user_ids: Vec<i64>,

    pub max_target_chats: usize,
    pub target_chats_file: PathBuf,

    /// Upper bound for a single outbound Bot API call during fan-out.
    pub send_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_env()
    }

    fn from_env() -> Result<Self> {
        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        // A missing or malformed channel id disables the relay instead of
        // aborting; commands still function in that state.
        let source_channel_id = match env_str("NOTIFICATION_CHANNEL_ID").and_then(non_empty) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(value = %raw, "NOTIFICATION_CHANNEL_ID is not a valid chat id; relay disabled");
                    None
                }
            },
            None => {
                warn!("NOTIFICATION_CHANNEL_ID not set; relay disabled until configured");
                None
            }
        };

        let authorized_user_ids = parse_csv_i64(env_str("AUTHORIZED_USERS"));
        let max_target_chats = env_usize("MAX_TARGET_CHATS").unwrap_or(100);
        let target_chats_file = env_path("TARGET_CHATS_FILE")
            .unwrap_or_else(|| PathBuf::from("target_chats.json"));
        let send_timeout = Duration::from_millis(env_u64("SEND_TIMEOUT_MS").unwrap_or(5_000));

        Ok(Self {
            bot_token,
            source_channel_id,
            authorized_user_ids,
            max_target_chats,
            target_chats_file,
            send_timeout,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

/// Parse a comma-separated id list, deduplicating and warning on entries that
/// are not valid integers rather than failing startup.
fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    let mut out = Vec::new();
    for part in v.unwrap_or_default().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<i64>() {
            Ok(id) => {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
            Err(_) => warn!(entry = %part, "ignoring malformed AUTHORIZED_USERS entry"),
        }
    }
    out
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing_skips_junk_and_duplicates() {
        let ids = parse_csv_i64(Some("123, -456,nope, 123 ,,789".to_string()));
        assert_eq!(ids, vec![123, -456, 789]);
    }

    #[test]
    fn csv_parsing_handles_missing_value() {
        assert!(parse_csv_i64(None).is_empty());
        assert!(parse_csv_i64(Some("".to_string())).is_empty());
    }

    #[test]
    fn dotenv_sets_only_unset_keys() {
        let path = PathBuf::from(format!("/tmp/fwdbot-env-{}", std::process::id()));
        std::fs::write(
            &path,
            "# comment\nFWDBOT_TEST_A=one\nFWDBOT_TEST_B='two'\nFWDBOT_TEST_C=\"three\"\n",
        )
        .unwrap();
        env::set_var("FWDBOT_TEST_A", "preset");

        load_dotenv_if_present(&path);

        assert_eq!(env::var("FWDBOT_TEST_A").unwrap(), "preset");
        assert_eq!(env::var("FWDBOT_TEST_B").unwrap(), "two");
        assert_eq!(env::var("FWDBOT_TEST_C").unwrap(), "three");

        let _ = std::fs::remove_file(&path);
    }
}
