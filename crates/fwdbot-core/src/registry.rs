use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{domain::ChatId, errors::Error, Result};

/// Outcome of [`ChatRegistry::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
    LimitReached,
}

/// Outcome of [`ChatRegistry::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

/// Wire form of the store: a JSON array of chat ids, rewritten wholesale on
/// every successful mutation.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct StoredChats(Vec<i64>);

/// The set of destination chats, persisted to a JSON file.
///
/// The in-memory set is authoritative: mutations apply in memory first and
/// then persist synchronously. A failed persist leaves memory ahead of disk
/// until the next successful write; that divergence is accepted rather than
/// rolling back the mutation.
#[derive(Debug)]
pub struct ChatRegistry {
    path: PathBuf,
    max_chats: usize,
    chats: Mutex<Vec<ChatId>>,
}

impl ChatRegistry {
    /// A fresh registry with no chats, not yet backed by a store file.
    pub fn new(path: impl Into<PathBuf>, max_chats: usize) -> Self {
        Self {
            path: path.into(),
            max_chats,
            chats: Mutex::new(Vec::new()),
        }
    }

    /// Load the persisted destination set. An absent store file is a normal
    /// first run and yields an empty registry; a malformed one is reported as
    /// [`Error::PersistenceCorrupt`] so the caller can choose its policy.
    pub fn load(path: impl Into<PathBuf>, max_chats: usize) -> Result<Self> {
        let path = path.into();
        let chats = match fs::read_to_string(&path) {
            Ok(txt) => {
                let stored: StoredChats =
                    serde_json::from_str(&txt).map_err(|e| Error::PersistenceCorrupt {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                let mut out: Vec<ChatId> = Vec::with_capacity(stored.0.len());
                for id in stored.0 {
                    let id = ChatId(id);
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
                out
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            max_chats,
            chats: Mutex::new(chats),
        })
    }

    /// Register a destination chat. Persists before returning `Added`.
    pub fn add(&self, id: ChatId) -> Result<AddOutcome> {
        let snapshot = {
            let mut chats = self.lock();
            if chats.contains(&id) {
                return Ok(AddOutcome::AlreadyPresent);
            }
            if chats.len() >= self.max_chats {
                return Ok(AddOutcome::LimitReached);
            }
            chats.push(id);
            chats.clone()
        };
        self.persist(&snapshot)?;
        Ok(AddOutcome::Added)
    }

    /// Unregister a destination chat. Persists before returning `Removed`.
    pub fn remove(&self, id: ChatId) -> Result<RemoveOutcome> {
        let snapshot = {
            let mut chats = self.lock();
            let before = chats.len();
            chats.retain(|c| *c != id);
            if chats.len() == before {
                return Ok(RemoveOutcome::NotPresent);
            }
            chats.clone()
        };
        self.persist(&snapshot)?;
        Ok(RemoveOutcome::Removed)
    }

    /// Remove every listed chat that is present, persisting at most once.
    /// Returns how many chats were actually removed.
    pub fn remove_all(&self, ids: &[ChatId]) -> Result<usize> {
        let (removed, snapshot) = {
            let mut chats = self.lock();
            let before = chats.len();
            chats.retain(|c| !ids.contains(c));
            (before - chats.len(), chats.clone())
        };
        if removed > 0 {
            self.persist(&snapshot)?;
        }
        Ok(removed)
    }

    /// Point-in-time copy of the destination set, in insertion order.
    pub fn snapshot(&self) -> Vec<ChatId> {
        self.lock().clone()
    }

    pub fn contains(&self, id: ChatId) -> bool {
        self.lock().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn max_chats(&self) -> usize {
        self.max_chats
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChatId>> {
        self.chats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, chats: &[ChatId]) -> Result<()> {
        let stored = StoredChats(chats.iter().map(|c| c.0).collect());
        let txt = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, txt).map_err(|source| Error::PersistenceWrite {
            path: self.path.clone(),
            source,
        })
    }
}
