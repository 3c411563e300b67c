use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::GenerationConfig,
    error::{Result, SyllabusError},
    provider::Provider,
};

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_content: String,
    /// JSON schema the response should follow, when the backend supports it.
    pub schema: Option<Value>,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// A text-generation backend returning one JSON document per call.
///
/// Any error is recoverable from the caller's point of view.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value>;
}

#[derive(Deserialize)]
struct ChatResponse {
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

/// Generator over an OpenAI-compatible chat completions endpoint.
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    provider: Provider,
    api_key: String,
    temperature: f32,
}

impl ChatCompletionsGenerator {
    pub fn new(provider: Provider, config: &GenerationConfig) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        tracing::info!(
            provider = provider.name(),
            model = provider.config().model,
            timeout_secs = config.timeout_secs,
            "generation client ready"
        );

        Ok(Self {
            client,
            provider,
            api_key,
            temperature: config.temperature,
        })
    }

    fn response_format(&self, schema: Option<&Value>) -> Value {
        match schema {
            Some(schema) if self.provider.config().structured_output => serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": "response", "schema": schema },
            }),
            _ => serde_json::json!({ "type": "json_object" }),
        }
    }
}

#[async_trait]
impl Generator for ChatCompletionsGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let config = self.provider.config();

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "system",
                        "content": &request.system_prompt,
                    },
                    {
                        "role": "user",
                        "content": &request.user_content,
                    },
                ],
                "temperature": self.temperature,
                "response_format": self.response_format(request.schema.as_ref()),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyllabusError::Generation {
                reason: format!("{} returned {}: {}", self.provider.name(), status, body),
            });
        }

        let response: ChatResponse = response.json().await?;
        let content = response
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| SyllabusError::InvalidResponse {
                reason: "response has no message content".to_string(),
            })?;

        parse_json_content(&content)
    }
}

/// Parse a model reply as JSON, tolerating a surrounding Markdown code fence.
pub fn parse_json_content(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| SyllabusError::InvalidResponse {
        reason: format!("reply is not valid JSON: {e}"),
    })
}
