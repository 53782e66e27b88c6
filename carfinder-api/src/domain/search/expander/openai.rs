//! Query expander backed by an OpenAI-compatible chat completion endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::search::traits::{QueryExpander, Result, SearchError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You rewrite used-car search queries. Expand slang, \
abbreviations and generation codes into plain make, model and year terms \
(for example \"e46 m3\" becomes \"BMW M3 1999 2006\", \"chevy\" becomes \"Chevrolet\"). \
Keep prices, mileage and other words unchanged. Reply with the rewritten query only.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Expander that asks a chat model to rewrite the query.
///
/// # Example
///
/// ```ignore
/// let expander = OpenAiExpander::new(api_key, DEFAULT_BASE_URL, DEFAULT_MODEL, timeout)?;
/// let text = expander.expand("e46 m3 under 20k").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiExpander {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiExpander {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SearchError::Config("expander api key is empty".into()));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn request<'a>(&'a self, raw: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: raw,
                },
            ],
            temperature: 0.0,
            max_tokens: 64,
        }
    }
}

fn first_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().trim_matches('"').to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| SearchError::Expansion("No content in completion".into()))
}

#[async_trait]
impl QueryExpander for OpenAiExpander {
    async fn expand(&self, raw: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request(raw))
            .send()
            .await
            .map_err(|e| SearchError::Expansion(e.to_string()))?
            .error_for_status()
            .map_err(|e| SearchError::Expansion(e.to_string()))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Expansion(e.to_string()))?;

        first_text(body)
    }
}
