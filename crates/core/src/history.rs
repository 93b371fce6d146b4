use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::conversation::Conversation;

/// Capability seam over per-user conversation storage. Callers receive and
/// replace whole conversations; an eviction operation can be added here later
/// without touching relay call sites.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns the stored conversation, or an empty one for unseen users.
    async fn get(&self, user_id: &str) -> Conversation;

    /// Replaces the stored conversation wholesale.
    async fn set(&self, user_id: &str, conversation: Conversation);
}

/// Process-lifetime map with no eviction and no persistence across restarts.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get(&self, user_id: &str) -> Conversation {
        self.conversations.lock().await.get(user_id).cloned().unwrap_or_default()
    }

    async fn set(&self, user_id: &str, conversation: Conversation) {
        self.conversations.lock().await.insert(user_id.to_owned(), conversation);
    }
}
