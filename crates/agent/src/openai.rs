use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use gloss_core::Role;

use crate::llm::{CompletionClient, CompletionError, CompletionRequest};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        timeout_secs: u64,
    ) -> Result<Self, CompletionError> {
        let key = api_key.expose_secret().trim().to_owned();
        if key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {key}");
        let mut auth_value = HeaderValue::from_str(&bearer)
            .map_err(|err| CompletionError::MalformedResponse(format!("invalid api key: {err}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;

        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(request.turns.len() + 2);
        messages.push(WireMessage { role: "system", content: &request.system_prompt });
        for turn in &request.turns {
            messages.push(WireMessage { role: wire_role(turn.role), content: &turn.content });
        }
        messages.push(WireMessage { role: "user", content: &request.message });

        let body = ChatCompletionsBody { model: &request.model, messages };
        let response = self.http.post(self.chat_completions_url()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status: status.as_u16(), body });
        }

        let parsed: ChatCompletionsResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::MalformedResponse("response has no choices".into()))?;
        choice
            .message
            .content
            .ok_or_else(|| CompletionError::MalformedResponse("choice has no content".into()))
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[derive(Serialize)]
struct ChatCompletionsBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
