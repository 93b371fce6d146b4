//! Slack interface for the Gloss assistant bot.
//!
//! - **Socket Mode** (`socket`) - WebSocket connection to Slack (no public URL needed)
//! - **Slash Commands** (`commands`) - `/polish <draft>` and `/gpt <message>`
//! - **Events** (`events`) - dispatcher and handlers for commands, button
//!   actions, modal submissions, and channel mentions
//! - **Block Kit** (`blocks`) - modal and message builders
//! - **Web API** (`api`) - the presenter: `views.open`/`views.update`,
//!   ephemeral and channel messages
//!
//! # Architecture
//!
//! ```text
//! Slack envelopes → SocketModeRunner → EventDispatcher → Handlers
//!                                                           │
//!                              Presenter (loading → final) ─┤
//!                              Responder (conversation relay)┘
//! ```
//!
//! Every trigger follows the same two-phase presentation: show a loading
//! surface, run the relay, then update the same surface with the final
//! content (or the generic apology on failure).

pub mod api;
pub mod blocks;
pub mod commands;
pub mod events;
pub mod socket;
