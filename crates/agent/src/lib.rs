//! Conversation relay for the Gloss assistant bot.
//!
//! The relay (`relay`) turns one Slack interaction into one call against a
//! hosted completion API while maintaining per-user conversational state:
//! compose stored history with the new message and the task's system prompt,
//! obtain a completion, post-process it, and persist the exchange.
//!
//! The completion call itself sits behind the `CompletionClient` trait
//! (`llm`), with an OpenAI-compatible HTTP implementation in `openai`.

pub mod llm;
pub mod openai;
pub mod relay;

pub use llm::{CompletionClient, CompletionError, CompletionRequest};
pub use openai::OpenAiClient;
pub use relay::ConversationRelay;
