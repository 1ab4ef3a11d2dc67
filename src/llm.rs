use anyhow::{Context, Result};
use async_openai::config::AzureConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use async_openai::Client;
use async_trait::async_trait;

/// Connection settings for the hosted generation endpoint. Always injected
/// from the environment, never hard-coded.
#[derive(Debug, Clone)]
pub struct AzureSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl AzureSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: require_env("AZURE_OPENAI_ENDPOINT")?,
            api_key: require_env("AZURE_OPENAI_KEY")?,
            deployment: require_env("AZURE_OPENAI_DEPLOYMENT")?,
            api_version: require_env("AZURE_OPENAI_VERSION")?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

/// Narrow seam over the remote generation service: one prompt in, prose out.
/// Any transport, auth or quota failure is fatal to the caller; there is no
/// retry and no partial output.
#[async_trait]
pub trait Summarizer {
    async fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Azure OpenAI chat-completion client. One single-turn user message, no
/// streaming.
pub struct AzureSummarizer {
    client: Client<AzureConfig>,
    deployment: String,
}

impl AzureSummarizer {
    pub fn new(settings: AzureSettings) -> Self {
        let config = AzureConfig::new()
            .with_api_base(settings.endpoint)
            .with_api_version(settings.api_version)
            .with_deployment_id(settings.deployment.clone())
            .with_api_key(settings.api_key);
        Self {
            client: Client::with_config(config),
            deployment: settings.deployment,
        }
    }
}

#[async_trait]
impl Summarizer for AzureSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequest {
            model: self.deployment.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    ..Default::default()
                },
            )],
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .context("chat completion request failed")?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .context("generation endpoint returned no choices")?;
        choice
            .message
            .content
            .context("generation endpoint returned an empty message")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_require_every_variable() {
        // run in a scratch env; only the first missing variable is reported
        std::env::remove_var("AZURE_OPENAI_ENDPOINT");
        let err = AzureSettings::from_env().unwrap_err();
        assert!(err.to_string().contains("AZURE_OPENAI_ENDPOINT"));
    }
}
