use crate::error::ExtractionError;
use crate::extraction::ExtractionEngine;
use crate::parsers::ContentFormat;
use crate::schema::ExtractionSchema;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const SYSTEM_PROMPT: &str = "You extract structured data from web pages. \
Answer only with a JSON object that matches the provided schema. \
Use the field descriptions as instructions and never invent values that are not on the page.";

/// Longest response body quoted in provider error messages
const MAX_ERROR_BODY: usize = 300;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// Extraction engine backed by an OpenAI-compatible chat completions API
pub struct OpenAiEngine {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl OpenAiEngine {
    /// Create an engine; a missing or blank key is a configuration failure
    pub fn new(
        api_key: Option<String>,
        model: &str,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExtractionError::FatalConfig(format!("{} is not set", API_KEY_VAR)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::FatalConfig(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(
        &'a self,
        content: &str,
        schema: &ExtractionSchema,
        format: ContentFormat,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Extract the data described by the schema from this {} page content.\n\n{}",
                        format.label(),
                        content
                    ),
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.to_json_schema(),
                    "strict": false,
                }
            }),
        }
    }
}

#[async_trait]
impl ExtractionEngine for OpenAiEngine {
    async fn extract(
        &self,
        content: &str,
        schema: &ExtractionSchema,
        format: ContentFormat,
    ) -> Result<Value, ExtractionError> {
        let url = format!("{}/chat/completions", self.api_base);
        ::log::debug!(
            "Calling {} with {} bytes of {}",
            self.model,
            content.len(),
            format.label()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(content, schema, format))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Provider(format!("request timed out: {e}"))
                } else {
                    ExtractionError::Provider(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(classify_status(status, &snippet));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Provider(format!("unreadable response: {e}")))?;

        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ExtractionError::MalformedOutput("response has no choices".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(ExtractionError::MalformedOutput(format!(
                "model refused: {refusal}"
            )));
        }

        let text = message
            .content
            .ok_or_else(|| ExtractionError::MalformedOutput("response has no content".to_string()))?;

        serde_json::from_str(&text)
            .map_err(|e| ExtractionError::MalformedOutput(format!("answer is not JSON: {e}")))
    }
}

fn classify_status(status: StatusCode, body: &str) -> ExtractionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExtractionError::FatalConfig(format!(
            "{} rejected by provider ({}): {}",
            API_KEY_VAR, status, body
        )),
        _ => ExtractionError::Provider(format!("provider returned {}: {}", status, body)),
    }
}
