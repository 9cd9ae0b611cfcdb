use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{CompletionModel, CompletionResult, Message, Usage};
use crate::embedding::openai::DEFAULT_OPENAI_BASE_URL;

/// Chat completion model via the OpenAI API or any compatible server.
pub struct OpenAICompletionModel {
    model_name: String,
    api_key: String,
    endpoint: String,
    default_max_tokens: u32,
    default_temperature: f64,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageResponse>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsageResponse {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAICompletionModel {
    pub fn new(
        model_name: &str,
        api_key: &str,
        base_url: Option<&str>,
        default_max_tokens: u32,
        default_temperature: f64,
    ) -> Self {
        let base = base_url.unwrap_or(DEFAULT_OPENAI_BASE_URL).trim_end_matches('/');
        Self {
            model_name: model_name.to_string(),
            api_key: api_key.to_string(),
            endpoint: format!("{base}/chat/completions"),
            default_max_tokens,
            default_temperature,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    async fn complete(
        &self,
        messages: &[Message],
        max_tokens: Option<u32>,
        temperature: Option<f64>,
    ) -> anyhow::Result<CompletionResult> {
        let request = ChatRequest {
            model: self.model_name.clone(),
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: Some(max_tokens.unwrap_or(self.default_max_tokens)),
            temperature: Some(temperature.unwrap_or(self.default_temperature)),
        };

        let resp = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI completion API error ({status}): {body}");
        }

        let response: ChatResponse = resp.json().await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        if let Some(u) = &usage {
            debug!(
                "Completion usage: prompt={} completion={} total={}",
                u.prompt_tokens, u.completion_tokens, u.total_tokens
            );
        }

        Ok(CompletionResult { content, usage })
    }
}
