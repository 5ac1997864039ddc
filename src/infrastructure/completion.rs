//! OpenAI-compatible chat completion client.

use crate::config::AppConfig;
use crate::core::assistant::ChatMessage;
use crate::error::CompletionError;
use crate::infrastructure::traits::{CompletionClient, CompletionRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
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
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(config: &AppConfig) -> Result<OpenAiCompletionClient, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(config.completion_timeout)
            .build()?;

        Ok(OpenAiCompletionClient {
            http,
            base_url: config.completion_api_base.trim_end_matches('/').to_owned(),
            api_key: config.completion_api_key.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, CompletionError> {
        self.api_key.as_deref().ok_or(CompletionError::NotConfigured)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CompletionError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(CompletionError::Status { status, body })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key()?)
            .json(&ChatCompletionBody {
                model: &request.model,
                messages: &request.messages,
                temperature: request.temperature,
            })
            .send()
            .await?;

        let payload: ChatCompletionResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(self.api_key()?)
            .send()
            .await?;

        let payload: ModelList = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let mut models: Vec<String> = payload
            .data
            .into_iter()
            .map(|model| model.id)
            .filter(|id| id.starts_with("gpt-4") || id.starts_with('o'))
            .collect();
        models.sort();
        Ok(models)
    }
}
