//! Slack Web API client. Doubles as the presenter the event handlers drive:
//! open a loading view, then update the same view with the final content.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::blocks::{MessageTemplate, ModalView};

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack api transport failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api `{method}` returned error: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack api `{method}` returned a malformed payload: {detail}")]
    Malformed { method: &'static str, detail: String },
}

/// The UI surface the handlers render into. Implemented by `SlackApiClient`
/// for production and by fakes in handler tests.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Opens a modal and returns its view id for the follow-up update.
    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<String, SlackApiError>;

    /// Replaces the content of an already-open modal.
    async fn update_view(&self, view_id: &str, view: &ModalView) -> Result<(), SlackApiError>;

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), SlackApiError>;

    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError>;
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: SecretString,
    bot_token: SecretString,
}

impl SlackApiClient {
    pub fn new(
        api_base: &str,
        app_token: SecretString,
        bot_token: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .user_agent("gloss-bot")
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;

        Ok(Self { http, api_base: api_base.trim_end_matches('/').to_owned(), app_token, bot_token })
    }

    /// Resolves the bot's own user id, used to strip mention tokens.
    pub async fn resolve_bot_user_id(&self) -> Result<String, SlackApiError> {
        let response: AuthTestResponse = self.call("auth.test", &json!({}), TokenKind::Bot).await?;
        check_ok("auth.test", response.ok, response.error)?;
        response.user_id.ok_or(SlackApiError::Malformed {
            method: "auth.test",
            detail: "missing user_id".to_owned(),
        })
    }

    /// Requests a fresh Socket Mode websocket URL.
    pub async fn connections_open(&self) -> Result<String, SlackApiError> {
        let response: ConnectionsOpenResponse =
            self.call("apps.connections.open", &json!({}), TokenKind::App).await?;
        check_ok("apps.connections.open", response.ok, response.error)?;
        response.url.ok_or(SlackApiError::Malformed {
            method: "apps.connections.open",
            detail: "missing url".to_owned(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &serde_json::Value,
        token: TokenKind,
    ) -> Result<T, SlackApiError> {
        let bearer = match token {
            TokenKind::App => self.app_token.expose_secret(),
            TokenKind::Bot => self.bot_token.expose_secret(),
        };

        let response = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackApiError::Api {
                method,
                error: format!("http status {}", status.as_u16()),
            });
        }

        response.json::<T>().await.map_err(|err| SlackApiError::Malformed {
            method,
            detail: err.to_string(),
        })
    }
}

enum TokenKind {
    App,
    Bot,
}

fn check_ok(
    method: &'static str,
    ok: bool,
    error: Option<String>,
) -> Result<(), SlackApiError> {
    if ok {
        return Ok(());
    }
    Err(SlackApiError::Api {
        method,
        error: error.unwrap_or_else(|| "unknown_error".to_owned()),
    })
}

#[async_trait]
impl Presenter for SlackApiClient {
    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<String, SlackApiError> {
        let response: ViewsOpenResponse = self
            .call("views.open", &json!({ "trigger_id": trigger_id, "view": view }), TokenKind::Bot)
            .await?;
        check_ok("views.open", response.ok, response.error)?;
        response.view.map(|view| view.id).ok_or(SlackApiError::Malformed {
            method: "views.open",
            detail: "missing view id".to_owned(),
        })
    }

    async fn update_view(&self, view_id: &str, view: &ModalView) -> Result<(), SlackApiError> {
        let response: ViewsUpdateResponse = self
            .call("views.update", &json!({ "view_id": view_id, "view": view }), TokenKind::Bot)
            .await?;
        check_ok("views.update", response.ok, response.error)
    }

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<(), SlackApiError> {
        let response: PostMessageResponse = self
            .call(
                "chat.postEphemeral",
                &json!({ "channel": channel_id, "user": user_id, "text": text }),
                TokenKind::Bot,
            )
            .await?;
        check_ok("chat.postEphemeral", response.ok, response.error)
    }

    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let mut body = json!({
            "channel": channel_id,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }

        let response: PostMessageResponse =
            self.call("chat.postMessage", &body, TokenKind::Bot).await?;
        check_ok("chat.postMessage", response.ok, response.error)
    }
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViewsOpenResponse {
    ok: bool,
    view: Option<ViewHandle>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViewHandle {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ViewsUpdateResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}
