use async_trait::async_trait;

use crate::{conversation::Conversation, errors::RelayError, tasks::TaskName};

/// Outcome of one successful relay call. `conversation` is the updated
/// history exactly as persisted in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayResult {
    pub rendered_text: String,
    pub conversation: Conversation,
}

/// Contract between the Slack layer and the agent. Each call is a complete
/// unit of work: compose history with the new message, obtain a completion,
/// persist the exchange, and return the renderable result.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Responds against the store's current history for `user_id`.
    async fn respond(
        &self,
        user_id: &str,
        message: &str,
        task: TaskName,
    ) -> Result<RelayResult, RelayError>;

    /// Responds against an explicit history instead of the store's current
    /// value. Used for regenerate flows: replaying a message with the
    /// pre-exchange history replaces the last turn pair rather than
    /// accumulating.
    async fn respond_with_history(
        &self,
        user_id: &str,
        message: &str,
        task: TaskName,
        history: Conversation,
    ) -> Result<RelayResult, RelayError>;
}
