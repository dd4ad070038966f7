//! Session id to history store mapping

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::history::HistoryStore;

/// A history store that can be locked independently of every other session
pub type SharedHistory = Arc<Mutex<HistoryStore>>;

/// Owns one [`HistoryStore`] per session id.
///
/// Looking up an unknown id creates an empty store. Stores live until the
/// registry is dropped.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedHistory>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the store for `session_id`, creating it on first reference
    pub async fn get_or_create(&self, session_id: &str) -> SharedHistory {
        if let Some(store) = self.sessions.read().await.get(session_id) {
            return Arc::clone(store);
        }

        let mut sessions = self.sessions.write().await;
        let store = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session = session_id, "Creating history store");
            Arc::new(Mutex::new(HistoryStore::new(session_id)))
        });
        Arc::clone(store)
    }

    /// Get the store for `session_id` without creating it
    pub async fn get(&self, session_id: &str) -> Option<SharedHistory> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Known session ids, sorted
    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
