//! Thread registry shared between the command handlers and the poll loop

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Opaque Instagram direct thread identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ThreadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Map from thread id to the canned reply sent for every new message in it.
///
/// Cloning yields another handle onto the same map, so the webhook task and
/// the poll task can each hold one.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Arc<RwLock<HashMap<ThreadId, String>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or overwrite the reply for a thread.
    ///
    /// Returns the previous reply if the thread was already registered.
    pub async fn upsert(&self, thread_id: ThreadId, reply: String) -> Option<String> {
        let mut entries = self.entries.write().await;
        entries.insert(thread_id, reply)
    }

    /// Remove a thread. Returns `false` if it was not registered.
    pub async fn remove(&self, thread_id: &ThreadId) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(thread_id).is_some()
    }

    /// Copy of all entries, sorted by thread id.
    ///
    /// The lock is released before this returns; callers iterate the copy.
    pub async fn snapshot(&self) -> Vec<(ThreadId, String)> {
        let entries = self.entries.read().await;
        let mut snapshot: Vec<(ThreadId, String)> = entries
            .iter()
            .map(|(id, reply)| (id.clone(), reply.clone()))
            .collect();
        drop(entries);

        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    /// Number of registered threads
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}
