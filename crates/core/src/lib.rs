//! Core domain model for the Gloss assistant bot:
//! - **Conversation** (`conversation`) - role-tagged turns and the alternation invariant
//! - **History** (`history`) - per-user conversation storage capability
//! - **Tasks** (`tasks`) - the declarative variant table (prompt, model, post-processing)
//! - **Relay** (`relay`) - contract between the Slack layer and the agent
//! - **Config** (`config`) - layered file/env configuration with fail-fast validation

pub mod config;
pub mod conversation;
pub mod errors;
pub mod history;
pub mod relay;
pub mod tasks;

pub use conversation::{is_well_formed, Conversation, Role, Turn};
pub use errors::RelayError;
pub use history::{HistoryStore, InMemoryHistoryStore};
pub use relay::{RelayResult, Responder};
pub use tasks::{PostProcess, TaskName, TaskRegistry, TaskVariant};
