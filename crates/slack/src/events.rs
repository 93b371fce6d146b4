//! Event model and handlers for the Socket Mode stream.
//!
//! Every interaction follows the same two-phase shape: show something
//! immediately (a loading modal or the submission ack), relay the text to the
//! completion backend, then replace the placeholder with the result. Relay
//! failures render the apology copy in place; only Slack API failures bubble
//! out of a handler.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use gloss_core::{Responder, TaskName};
use thiserror::Error;
use tracing::warn;

use crate::{
    api::{Presenter, SlackApiError},
    blocks::{
        chat_loading_view, chat_view, error_view, mention_reply, polish_error_view,
        polish_loading_view, polish_result_view, CHAT_MODAL_CALLBACK_ID, REGENERATE_ACTION_ID,
    },
    commands::{parse_command, strip_mentions, BotCommand, CommandParseError, SlashCommandPayload},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    BlockAction(BlockActionEvent),
    ViewSubmission(ViewSubmissionEvent),
    AppMention(AppMentionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::ViewSubmission(_) => SlackEventType::ViewSubmission,
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    BlockAction,
    ViewSubmission,
    AppMention,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub user_id: String,
    pub view_id: Option<String>,
    pub action_id: String,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmissionEvent {
    pub user_id: String,
    pub view_id: String,
    pub callback_id: String,
    pub submitted_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppMentionEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Completed,
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Presenter(#[from] SlackApiError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Wires all four interaction handlers against one presenter and responder.
pub fn build_dispatcher(
    presenter: Arc<dyn Presenter>,
    responder: Arc<dyn Responder>,
    bot_user_id: String,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(presenter.clone(), responder.clone()));
    dispatcher.register(RegenerateActionHandler::new(presenter.clone(), responder.clone()));
    dispatcher.register(ChatSubmissionHandler::new(presenter.clone(), responder.clone()));
    dispatcher.register(MentionHandler::new(presenter, responder, bot_user_id));
    dispatcher
}

/// Polish replies never enter the chat history, so its exchanges live under a
/// scoped key that the chat and mention flows cannot read.
fn polish_history_key(user_id: &str) -> String {
    format!("polish:{user_id}")
}

pub struct SlashCommandHandler {
    presenter: Arc<dyn Presenter>,
    responder: Arc<dyn Responder>,
}

impl SlashCommandHandler {
    pub fn new(presenter: Arc<dyn Presenter>, responder: Arc<dyn Responder>) -> Self {
        Self { presenter, responder }
    }

    async fn handle_polish(
        &self,
        payload: &SlashCommandPayload,
        draft: &str,
    ) -> Result<HandlerResult, EventHandlerError> {
        let view_id = self.presenter.open_view(&payload.trigger_id, &polish_loading_view()).await?;

        let outcome = self
            .responder
            .respond_with_history(
                &polish_history_key(&payload.user_id),
                draft,
                TaskName::Polish,
                Vec::new(),
            )
            .await;

        let view = match outcome {
            Ok(result) => polish_result_view(draft, &result.rendered_text),
            Err(error) => {
                warn!(user_id = %payload.user_id, %error, "polish relay failed");
                polish_error_view(draft, error.user_message())
            }
        };
        self.presenter.update_view(&view_id, &view).await?;
        Ok(HandlerResult::Completed)
    }

    async fn handle_chat(
        &self,
        payload: &SlashCommandPayload,
        message: &str,
    ) -> Result<HandlerResult, EventHandlerError> {
        let view_id = self.presenter.open_view(&payload.trigger_id, &chat_loading_view()).await?;

        let outcome = self.responder.respond(&payload.user_id, message, TaskName::Chat).await;
        let view = match outcome {
            Ok(result) => chat_view(&result.conversation),
            Err(error) => {
                warn!(user_id = %payload.user_id, %error, "chat relay failed");
                error_view(error.user_message())
            }
        };
        self.presenter.update_view(&view_id, &view).await?;
        Ok(HandlerResult::Completed)
    }
}

#[async_trait]
impl EventHandler for SlashCommandHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let command = match parse_command(payload) {
            Ok(command) => command,
            Err(CommandParseError::UnsupportedCommand(_)) => {
                warn!(command = %payload.command, "ignoring unsupported slash command");
                return Ok(HandlerResult::Ignored);
            }
        };

        if command.text().is_empty() {
            self.presenter
                .post_ephemeral(&payload.channel_id, &payload.user_id, command.usage_hint())
                .await?;
            return Ok(HandlerResult::Completed);
        }

        match &command {
            BotCommand::Polish { draft } => self.handle_polish(payload, draft).await,
            BotCommand::Chat { message } => self.handle_chat(payload, message).await,
        }
    }
}

pub struct RegenerateActionHandler {
    presenter: Arc<dyn Presenter>,
    responder: Arc<dyn Responder>,
}

impl RegenerateActionHandler {
    pub fn new(presenter: Arc<dyn Presenter>, responder: Arc<dyn Responder>) -> Self {
        Self { presenter, responder }
    }
}

#[async_trait]
impl EventHandler for RegenerateActionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.action_id != REGENERATE_ACTION_ID {
            warn!(action_id = %event.action_id, "ignoring unknown block action");
            return Ok(HandlerResult::Ignored);
        }
        let (Some(view_id), Some(draft)) = (&event.view_id, &event.value) else {
            warn!("regenerate action without view id or draft payload");
            return Ok(HandlerResult::Ignored);
        };

        // Replaying with an empty history override replaces the previous
        // polish exchange instead of stacking a second one on top of it.
        let outcome = self
            .responder
            .respond_with_history(
                &polish_history_key(&event.user_id),
                draft,
                TaskName::Polish,
                Vec::new(),
            )
            .await;

        let view = match outcome {
            Ok(result) => polish_result_view(draft, &result.rendered_text),
            Err(error) => {
                warn!(user_id = %event.user_id, %error, "regenerate relay failed");
                polish_error_view(draft, error.user_message())
            }
        };
        self.presenter.update_view(view_id, &view).await?;
        Ok(HandlerResult::Completed)
    }
}

pub struct ChatSubmissionHandler {
    presenter: Arc<dyn Presenter>,
    responder: Arc<dyn Responder>,
}

impl ChatSubmissionHandler {
    pub fn new(presenter: Arc<dyn Presenter>, responder: Arc<dyn Responder>) -> Self {
        Self { presenter, responder }
    }
}

#[async_trait]
impl EventHandler for ChatSubmissionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ViewSubmission
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ViewSubmission(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.callback_id != CHAT_MODAL_CALLBACK_ID {
            return Ok(HandlerResult::Ignored);
        }

        let message = event.submitted_text.as_deref().unwrap_or_default();
        let outcome = self.responder.respond(&event.user_id, message, TaskName::Chat).await;
        let view = match outcome {
            Ok(result) => chat_view(&result.conversation),
            Err(error) => {
                warn!(user_id = %event.user_id, %error, "chat submission relay failed");
                error_view(error.user_message())
            }
        };
        self.presenter.update_view(&event.view_id, &view).await?;
        Ok(HandlerResult::Completed)
    }
}

pub struct MentionHandler {
    presenter: Arc<dyn Presenter>,
    responder: Arc<dyn Responder>,
    bot_user_id: String,
}

impl MentionHandler {
    pub fn new(
        presenter: Arc<dyn Presenter>,
        responder: Arc<dyn Responder>,
        bot_user_id: String,
    ) -> Self {
        Self { presenter, responder, bot_user_id }
    }
}

#[async_trait]
impl EventHandler for MentionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppMention
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::AppMention(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.user_id == self.bot_user_id {
            return Ok(HandlerResult::Ignored);
        }

        let question = strip_mentions(&event.text);
        let outcome = self.responder.respond(&event.user_id, &question, TaskName::Mention).await;
        let thread_ts = event.thread_ts.as_deref().unwrap_or(&event.ts);

        match outcome {
            Ok(result) => {
                let message = mention_reply(&event.user_id, &result.rendered_text);
                self.presenter.post_message(&event.channel_id, Some(thread_ts), &message).await?;
            }
            Err(error) => {
                warn!(user_id = %event.user_id, %error, "mention relay failed");
                self.presenter
                    .post_ephemeral(&event.channel_id, &event.user_id, error.user_message())
                    .await?;
            }
        }
        Ok(HandlerResult::Completed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use async_trait::async_trait;
    use gloss_core::{Conversation, RelayError, RelayResult, Responder, TaskName, Turn};

    use super::{
        build_dispatcher, AppMentionEvent, BlockActionEvent, EventContext, EventDispatcher,
        HandlerResult, SlackEnvelope, SlackEvent, ViewSubmissionEvent,
    };
    use crate::{
        api::{Presenter, SlackApiError},
        blocks::{
            MessageTemplate, ModalView, CHAT_MODAL_CALLBACK_ID, LOADING_CALLBACK_ID,
            POLISH_RESULT_CALLBACK_ID, REGENERATE_ACTION_ID,
        },
        commands::SlashCommandPayload,
    };

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum PresenterCall {
        OpenView { trigger_id: String, callback_id: String },
        UpdateView { view_id: String, callback_id: String },
        PostEphemeral { channel_id: String, user_id: String, text: String },
        PostMessage { channel_id: String, thread_ts: Option<String>, fallback_text: String },
    }

    #[derive(Default)]
    struct RecordingPresenter {
        calls: Mutex<Vec<PresenterCall>>,
        updated_views: Mutex<Vec<ModalView>>,
    }

    impl RecordingPresenter {
        fn calls(&self) -> Vec<PresenterCall> {
            self.calls.lock().unwrap().clone()
        }

        fn last_updated_view(&self) -> ModalView {
            self.updated_views.lock().unwrap().last().cloned().expect("a view was updated")
        }
    }

    #[async_trait]
    impl Presenter for RecordingPresenter {
        async fn open_view(
            &self,
            trigger_id: &str,
            view: &ModalView,
        ) -> Result<String, SlackApiError> {
            self.calls.lock().unwrap().push(PresenterCall::OpenView {
                trigger_id: trigger_id.to_owned(),
                callback_id: view.callback_id.clone(),
            });
            Ok("V-OPENED".to_owned())
        }

        async fn update_view(&self, view_id: &str, view: &ModalView) -> Result<(), SlackApiError> {
            self.calls.lock().unwrap().push(PresenterCall::UpdateView {
                view_id: view_id.to_owned(),
                callback_id: view.callback_id.clone(),
            });
            self.updated_views.lock().unwrap().push(view.clone());
            Ok(())
        }

        async fn post_ephemeral(
            &self,
            channel_id: &str,
            user_id: &str,
            text: &str,
        ) -> Result<(), SlackApiError> {
            self.calls.lock().unwrap().push(PresenterCall::PostEphemeral {
                channel_id: channel_id.to_owned(),
                user_id: user_id.to_owned(),
                text: text.to_owned(),
            });
            Ok(())
        }

        async fn post_message(
            &self,
            channel_id: &str,
            thread_ts: Option<&str>,
            message: &MessageTemplate,
        ) -> Result<(), SlackApiError> {
            self.calls.lock().unwrap().push(PresenterCall::PostMessage {
                channel_id: channel_id.to_owned(),
                thread_ts: thread_ts.map(str::to_owned),
                fallback_text: message.fallback_text.clone(),
            });
            Ok(())
        }
    }

    #[derive(Clone, Debug)]
    struct RecordedExchange {
        user_id: String,
        message: String,
        task: TaskName,
        override_history: Option<usize>,
    }

    struct ScriptedResponder {
        reply: Result<String, RelayError>,
        exchanges: Mutex<Vec<RecordedExchange>>,
        calls: AtomicUsize,
    }

    impl ScriptedResponder {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_owned()),
                exchanges: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(RelayError::CompletionFailed("backend offline".to_owned())),
                exchanges: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn exchanges(&self) -> Vec<RecordedExchange> {
            self.exchanges.lock().unwrap().clone()
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(
            &self,
            user_id: &str,
            message: &str,
            task: TaskName,
            override_history: Option<usize>,
        ) -> Result<RelayResult, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.exchanges.lock().unwrap().push(RecordedExchange {
                user_id: user_id.to_owned(),
                message: message.to_owned(),
                task,
                override_history,
            });
            let rendered = self.reply.clone()?;
            Ok(RelayResult {
                rendered_text: rendered.clone(),
                conversation: vec![Turn::user(message), Turn::assistant(&rendered)],
            })
        }
    }

    #[async_trait]
    impl Responder for ScriptedResponder {
        async fn respond(
            &self,
            user_id: &str,
            message: &str,
            task: TaskName,
        ) -> Result<RelayResult, RelayError> {
            self.record(user_id, message, task, None)
        }

        async fn respond_with_history(
            &self,
            user_id: &str,
            message: &str,
            task: TaskName,
            history: Conversation,
        ) -> Result<RelayResult, RelayError> {
            self.record(user_id, message, task, Some(history.len()))
        }
    }

    fn dispatcher_with(
        presenter: Arc<RecordingPresenter>,
        responder: Arc<ScriptedResponder>,
    ) -> EventDispatcher {
        build_dispatcher(presenter, responder, "UBOT".to_owned())
    }

    fn slash_envelope(command: &str, text: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: "env-1".to_owned(),
            event: SlackEvent::SlashCommand(SlashCommandPayload {
                command: command.to_owned(),
                text: text.to_owned(),
                user_id: "U1".to_owned(),
                channel_id: "C1".to_owned(),
                trigger_id: "trigger-1".to_owned(),
            }),
        }
    }

    #[tokio::test]
    async fn polish_opens_loading_view_then_updates_with_result() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("A finer sentence."));
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let result = dispatcher
            .dispatch(&slash_envelope("/polish", "a rough sentence"), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Completed);
        let calls = presenter.calls();
        assert_eq!(
            calls[0],
            PresenterCall::OpenView {
                trigger_id: "trigger-1".to_owned(),
                callback_id: LOADING_CALLBACK_ID.to_owned(),
            }
        );
        assert_eq!(
            calls[1],
            PresenterCall::UpdateView {
                view_id: "V-OPENED".to_owned(),
                callback_id: POLISH_RESULT_CALLBACK_ID.to_owned(),
            }
        );

        let exchange = &responder.exchanges()[0];
        assert_eq!(exchange.user_id, "polish:U1");
        assert_eq!(exchange.task, TaskName::Polish);
        assert_eq!(exchange.override_history, Some(0));
    }

    #[tokio::test]
    async fn empty_polish_text_gets_usage_hint_without_relay_call() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("unused"));
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        dispatcher
            .dispatch(&slash_envelope("/polish", "   "), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(responder.call_count(), 0);
        assert_eq!(
            presenter.calls(),
            vec![PresenterCall::PostEphemeral {
                channel_id: "C1".to_owned(),
                user_id: "U1".to_owned(),
                text: "Please provide a message to polish. Usage: `/polish <message>`".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn unsupported_slash_command_is_ignored() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("unused"));
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let result = dispatcher
            .dispatch(&slash_envelope("/weather", "tomorrow"), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
        assert!(presenter.calls().is_empty());
        assert_eq!(responder.call_count(), 0);
    }

    #[tokio::test]
    async fn regenerate_replays_the_original_draft_with_fresh_history() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("Another polish."));
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let envelope = SlackEnvelope {
            envelope_id: "env-2".to_owned(),
            event: SlackEvent::BlockAction(BlockActionEvent {
                user_id: "U1".to_owned(),
                view_id: Some("V77".to_owned()),
                action_id: REGENERATE_ACTION_ID.to_owned(),
                value: Some("the original draft".to_owned()),
            }),
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Completed);
        let exchange = &responder.exchanges()[0];
        assert_eq!(exchange.message, "the original draft");
        assert_eq!(exchange.override_history, Some(0));
        assert_eq!(
            presenter.calls(),
            vec![PresenterCall::UpdateView {
                view_id: "V77".to_owned(),
                callback_id: POLISH_RESULT_CALLBACK_ID.to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_block_action_is_ignored() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("unused"));
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let envelope = SlackEnvelope {
            envelope_id: "env-3".to_owned(),
            event: SlackEvent::BlockAction(BlockActionEvent {
                user_id: "U1".to_owned(),
                view_id: Some("V77".to_owned()),
                action_id: "some.other.action".to_owned(),
                value: None,
            }),
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);
        assert_eq!(responder.call_count(), 0);
    }

    #[tokio::test]
    async fn chat_submission_updates_the_modal_with_the_transcript() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("Here is an answer."));
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let envelope = SlackEnvelope {
            envelope_id: "env-4".to_owned(),
            event: SlackEvent::ViewSubmission(ViewSubmissionEvent {
                user_id: "U2".to_owned(),
                view_id: "V88".to_owned(),
                callback_id: CHAT_MODAL_CALLBACK_ID.to_owned(),
                submitted_text: Some("what is rust".to_owned()),
            }),
        };

        dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        let exchange = &responder.exchanges()[0];
        assert_eq!(exchange.user_id, "U2");
        assert_eq!(exchange.task, TaskName::Chat);
        assert_eq!(exchange.override_history, None);
        assert_eq!(
            presenter.calls(),
            vec![PresenterCall::UpdateView {
                view_id: "V88".to_owned(),
                callback_id: CHAT_MODAL_CALLBACK_ID.to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn relay_failure_renders_the_apology_view() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::failing());
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        dispatcher
            .dispatch(&slash_envelope("/gpt", "hello there"), &EventContext::default())
            .await
            .expect("dispatch");

        let view = presenter.last_updated_view();
        let body = serde_json::to_string(&view).expect("serialize view");
        assert!(body.contains("Sorry, there was an error processing your request."));
    }

    #[tokio::test]
    async fn failed_regenerate_keeps_the_draft_and_the_button() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::failing());
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let envelope = SlackEnvelope {
            envelope_id: "env-regen-fail".to_owned(),
            event: SlackEvent::BlockAction(BlockActionEvent {
                user_id: "U1".to_owned(),
                view_id: Some("V77".to_owned()),
                action_id: REGENERATE_ACTION_ID.to_owned(),
                value: Some("the original draft".to_owned()),
            }),
        };

        dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        let view = presenter.last_updated_view();
        let body = serde_json::to_string(&view).expect("serialize view");
        assert!(body.contains("Sorry, there was an error processing your request."));
        assert!(body.contains("the original draft"));
        assert!(body.contains(REGENERATE_ACTION_ID));
    }

    #[tokio::test]
    async fn failed_polish_command_keeps_the_draft_and_the_button() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::failing());
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        dispatcher
            .dispatch(&slash_envelope("/polish", "a rough sentence"), &EventContext::default())
            .await
            .expect("dispatch");

        let view = presenter.last_updated_view();
        let body = serde_json::to_string(&view).expect("serialize view");
        assert!(body.contains("Sorry, there was an error processing your request."));
        assert!(body.contains("a rough sentence"));
        assert!(body.contains(REGENERATE_ACTION_ID));
    }

    #[tokio::test]
    async fn mention_strips_the_bot_token_and_replies_in_thread() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("42."));
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let envelope = SlackEnvelope {
            envelope_id: "env-5".to_owned(),
            event: SlackEvent::AppMention(AppMentionEvent {
                channel_id: "C9".to_owned(),
                user_id: "U3".to_owned(),
                text: "<@UBOT> what is the answer".to_owned(),
                ts: "1730000000.1000".to_owned(),
                thread_ts: None,
            }),
        };

        dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        let exchange = &responder.exchanges()[0];
        assert_eq!(exchange.message, "what is the answer");
        assert_eq!(exchange.task, TaskName::Mention);

        let calls = presenter.calls();
        assert!(matches!(
            &calls[0],
            PresenterCall::PostMessage { channel_id, thread_ts, .. }
                if channel_id == "C9" && thread_ts.as_deref() == Some("1730000000.1000")
        ));
    }

    #[tokio::test]
    async fn mention_failure_falls_back_to_an_ephemeral_apology() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::failing());
        let dispatcher = dispatcher_with(presenter.clone(), responder.clone());

        let envelope = SlackEnvelope {
            envelope_id: "env-6".to_owned(),
            event: SlackEvent::AppMention(AppMentionEvent {
                channel_id: "C9".to_owned(),
                user_id: "U3".to_owned(),
                text: "<@UBOT> hello".to_owned(),
                ts: "1730000000.2000".to_owned(),
                thread_ts: Some("1730000000.1000".to_owned()),
            }),
        };

        dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert!(matches!(
            &presenter.calls()[0],
            PresenterCall::PostEphemeral { text, .. }
                if text.starts_with("Sorry, there was an error")
        ));
    }

    #[tokio::test]
    async fn dispatcher_ignores_events_with_no_handler() {
        let dispatcher = EventDispatcher::new();
        let envelope = SlackEnvelope {
            envelope_id: "env-7".to_owned(),
            event: SlackEvent::Unsupported { event_type: "reaction_added".to_owned() },
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);
    }

    #[test]
    fn build_dispatcher_registers_all_handlers() {
        let presenter = Arc::new(RecordingPresenter::default());
        let responder = Arc::new(ScriptedResponder::replying("unused"));
        let dispatcher = dispatcher_with(presenter, responder);
        assert_eq!(dispatcher.handler_count(), 4);
    }
}
