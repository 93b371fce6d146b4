use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use gloss_core::{
    is_well_formed, Conversation, HistoryStore, RelayError, RelayResult, Responder, TaskName,
    TaskRegistry, Turn,
};

use crate::llm::{CompletionClient, CompletionRequest};

/// Composes stored history with a new user message, invokes the completion
/// client, and persists the exchange. Calls for the same user are serialized
/// through a per-user mutex so a double-submit cannot drop an exchange from
/// stored history; calls for different users proceed concurrently.
pub struct ConversationRelay {
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn HistoryStore>,
    tasks: TaskRegistry,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationRelay {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn HistoryStore>,
        tasks: TaskRegistry,
    ) -> Self {
        Self { client, store, tasks, user_locks: Mutex::new(HashMap::new()) }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(user_id.to_owned()).or_default().clone()
    }

    async fn exchange(
        &self,
        user_id: &str,
        message: &str,
        task: TaskName,
        override_history: Option<Conversation>,
    ) -> Result<RelayResult, RelayError> {
        if message.trim().is_empty() {
            return Err(RelayError::EmptyInput);
        }

        let variant = self.tasks.get(task);
        let mut history = match override_history {
            Some(history) => history,
            None => self.store.get(user_id).await,
        };

        if !is_well_formed(&history) {
            // Availability over strictness: a corrupt entry becomes a fresh
            // conversation instead of a user-visible failure.
            warn!(
                user_id,
                task = variant.name.label(),
                turns = history.len(),
                "stored history violates alternation; treating as empty"
            );
            history.clear();
        }

        let generated = self
            .client
            .complete(CompletionRequest {
                model: variant.model.clone(),
                system_prompt: variant.system_prompt.to_owned(),
                turns: history.clone(),
                message: message.to_owned(),
            })
            .await
            .map_err(|error| RelayError::CompletionFailed(error.to_string()))?;

        let rendered_text = variant.apply_post_process(&generated);
        history.push(Turn::user(message));
        history.push(Turn::assistant(rendered_text.clone()));
        self.store.set(user_id, history.clone()).await;

        info!(
            user_id,
            task = variant.name.label(),
            turns = history.len(),
            "relay exchange persisted"
        );

        Ok(RelayResult { rendered_text, conversation: history })
    }
}

#[async_trait]
impl Responder for ConversationRelay {
    async fn respond(
        &self,
        user_id: &str,
        message: &str,
        task: TaskName,
    ) -> Result<RelayResult, RelayError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        self.exchange(user_id, message, task, None).await
    }

    async fn respond_with_history(
        &self,
        user_id: &str,
        message: &str,
        task: TaskName,
        history: Conversation,
    ) -> Result<RelayResult, RelayError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        self.exchange(user_id, message, task, Some(history)).await
    }
}
