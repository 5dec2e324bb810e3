//! Text Completion Client
//!
//! A thin request/response client for an Azure OpenAI chat-completions
//! deployment. Used by the podcast script pipeline.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub const CHAT_API_VERSION: &str = "2023-05-15";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single chat message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A generic client for interacting with an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends `messages` and returns the content of the first choice.
    ///
    /// Fails on any non-200 status or when the first choice has no content.
    async fn create_chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> Result<String>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// An implementation of `LLMClient` for an Azure OpenAI deployment.
///
/// The underlying `reqwest::Client` keeps its connection pool for the
/// lifetime of this value, so build one and share it.
pub struct AzureChatClient {
    http: reqwest::Client,
    api_key: SecretString,
    api_base: String,
    deployment: String,
}

impl AzureChatClient {
    /// # Arguments
    ///
    /// * `api_key` - Key sent in the `api-key` header.
    /// * `api_base` - Resource URL, e.g. `https://my-resource.openai.azure.com`.
    /// * `deployment` - The chat deployment name.
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            http: reqwest::Client::new(),
            api_key: SecretString::from(api_key.into()),
            api_base: api_base.trim_end_matches('/').to_string(),
            deployment: deployment.into(),
        }
    }

    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.api_base, self.deployment, CHAT_API_VERSION
        )
    }
}

#[async_trait]
impl LLMClient for AzureChatClient {
    async fn create_chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let url = self.endpoint_url();
        debug!(%url, messages = messages.len(), ?max_tokens, "Sending chat completion request");

        let response = self
            .http
            .post(&url)
            .header("api-key", self.api_key.expose_secret())
            .json(&ChatCompletionRequest {
                messages: &messages,
                max_tokens,
            })
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read chat completion response body")?;
        debug!(status = status.as_u16(), "Received chat completion response");

        if status != reqwest::StatusCode::OK {
            error!(status = status.as_u16(), body = %body, "Chat completion failed");
            bail!("Chat completion failed: {} - {}", status.as_u16(), body);
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).context("Chat completion response was not valid JSON")?;
        let completion = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty());

        match completion {
            Some(content) => {
                info!("Chat completion successful.");
                Ok(content)
            }
            None => {
                warn!("No content found in the response.");
                bail!("No content found in the response.")
            }
        }
    }
}
