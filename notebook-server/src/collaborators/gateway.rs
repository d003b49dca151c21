//! AI gateway client
//!
//! Sends a PDF document to an OpenRouter-compatible chat-completions API
//! and returns the raw course payload it produces. The payload is not
//! trusted; callers pass it through the normalizer.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use notebook_common::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "You are a JSON-only course structure generator. Never include any \
text outside the JSON object. Create at least 3 modules with at least 3 key takeaways each. You \
can create more modules and takeaways if the content warrants it.";

const USER_PROMPT: &str = r#"Analyze the provided document and create structured course content with multiple modules.

Respond with ONLY a valid JSON object of this shape:
{
  "title": "Course Title",
  "description": "A brief overview of the entire course",
  "modules": [
    {
      "heading": "Module Title",
      "summary": "Detailed summary of this module's content",
      "key_takeaways": ["Key point 1", "Key point 2", "Key point 3"]
    }
  ]
}

Requirements:
1. At least 3 modules, each on a distinct topic, in a logical progression
2. At least 3 key takeaways per module
3. Detailed, informative summaries
4. No markdown formatting or code blocks"#;

/// Raw generator output
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPayload {
    pub payload: Value,
    pub tokens_used: i64,
}

/// Produces a course payload from a source document
#[async_trait]
pub trait CourseGenerator: Send + Sync {
    async fn generate(&self, document: &[u8], model: &str, engine: &str) -> Result<GeneratedPayload>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<i64>,
}

/// OpenRouter chat-completions adapter
pub struct OpenRouterGenerator {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterGenerator {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(document: &[u8], model: &str, engine: &str) -> Value {
        let data_url = format!("data:application/pdf;base64,{}", STANDARD.encode(document));
        json!({
            "model": model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": USER_PROMPT},
                        {"type": "file", "file": {"filename": "document.pdf", "file_data": data_url}}
                    ]
                }
            ],
            "temperature": 0.2,
            "max_tokens": 2000,
            "response_format": {"type": "json_object"},
            "plugins": [{"id": "file-parser", "pdf": {"engine": engine}}]
        })
    }
}

fn gateway_error(context: &str, detail: impl std::fmt::Display) -> Error {
    Error::ExternalService(format!("{}: {}", context, detail))
}

/// Pull the JSON course payload out of a completion response
fn parse_completion(response: CompletionResponse) -> Result<GeneratedPayload> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| gateway_error("AI gateway", "response contained no content"))?;

    let payload: Value = serde_json::from_str(&content)
        .map_err(|e| gateway_error("AI response was not valid JSON", e))?;

    Ok(GeneratedPayload {
        payload,
        tokens_used: response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or(0),
    })
}

#[async_trait]
impl CourseGenerator for OpenRouterGenerator {
    async fn generate(&self, document: &[u8], model: &str, engine: &str) -> Result<GeneratedPayload> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| gateway_error("AI gateway", "no API key configured"))?;

        debug!(model, engine, document_bytes = document.len(), "Sending generation request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .header("X-Title", "notebook-server")
            .json(&Self::request_body(document, model, engine))
            .send()
            .await
            .map_err(|e| gateway_error("AI gateway request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(gateway_error(
                "AI gateway returned error",
                format!("{} {}", status, body),
            ));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| gateway_error("Failed to parse AI gateway response", e))?;

        let generated = parse_completion(completion)?;
        debug!(model, tokens = generated.tokens_used, "Received generation response");
        Ok(generated)
    }
}
