use std::sync::Arc;

use gloss_agent::{CompletionError, ConversationRelay, OpenAiClient};
use gloss_core::config::{AppConfig, ConfigError, LoadOptions};
use gloss_core::{InMemoryHistoryStore, TaskRegistry};
use gloss_slack::api::{SlackApiClient, SlackApiError};
use gloss_slack::events::build_dispatcher;
use gloss_slack::socket::{ReconnectPolicy, SocketModeRunner, WebSocketTransport};
use thiserror::Error;
use tracing::info;

const SLACK_API_BASE: &str = "https://slack.com/api";
const SLACK_HTTP_TIMEOUT_SECS: u64 = 30;

pub struct Application {
    pub bot_user_id: String,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client setup failed: {0}")]
    Slack(#[from] SlackApiError),
    #[error("completion client setup failed: {0}")]
    Completion(#[from] CompletionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!("starting application bootstrap");

    let slack_api = Arc::new(SlackApiClient::new(
        SLACK_API_BASE,
        config.slack.app_token.clone(),
        config.slack.bot_token.clone(),
        SLACK_HTTP_TIMEOUT_SECS,
    )?);

    let bot_user_id = slack_api.resolve_bot_user_id().await?;
    info!(bot_user_id = %bot_user_id, "slack identity resolved");

    let completion_client = Arc::new(OpenAiClient::new(
        &config.llm.base_url,
        &config.llm.api_key,
        config.llm.timeout_secs,
    )?);

    let relay = Arc::new(ConversationRelay::new(
        completion_client,
        Arc::new(InMemoryHistoryStore::default()),
        TaskRegistry::new(config.llm.model.clone()),
    ));

    let dispatcher = build_dispatcher(slack_api.clone(), relay, bot_user_id.clone());
    let transport = Arc::new(WebSocketTransport::new(slack_api));
    let slack_runner = SocketModeRunner::new(transport, dispatcher, ReconnectPolicy::default());

    info!(model = %config.llm.model, "application bootstrap complete");
    Ok(Application { bot_user_id, slack_runner })
}

#[cfg(test)]
mod tests {
    use gloss_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                llm_api_key: Some("sk-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_completion_api_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                llm_api_key: Some("   ".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("llm.api_key"));
    }
}
