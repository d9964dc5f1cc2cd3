//! OpenAI-compatible chat-completions engine.
//!
//! Sends the agent instructions with its output schema as the system message
//! and the JSON input as the user message. The reply content is returned as
//! [`RawOutput::Text`] for the coercion layer to pick apart.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use coordination::{Agent, RawOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ReasoningEngine;
use crate::config::SupportConfig;
use crate::prompts;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEngine {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for reasoning engine")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_config(config: &SupportConfig) -> Result<Self> {
        Self::new(
            &config.engine_url,
            &config.engine_model,
            config.engine_api_key.clone(),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn system_prompt(agent: &Agent) -> String {
        let contract = agent.output_contract();
        let schema = serde_json::to_string_pretty(&contract.schema).unwrap_or_default();
        let mut prompt = agent.instructions().to_string();
        prompt.push_str(&prompts::output_contract_suffix(&contract.name, &schema));
        prompt
    }

    fn build_request<'a>(&'a self, agent: &Agent, input: &Value) -> Result<ChatRequest<'a>> {
        let user = serde_json::to_string_pretty(input).context("Failed to serialize agent input")?;
        Ok(ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(agent),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        })
    }
}

/// Pull the first choice's message content out of a completion response.
fn reply_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("completion response carried no message content"))
}

#[async_trait]
impl ReasoningEngine for HttpEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn invoke(&self, agent: &Agent, input: &Value) -> Result<RawOutput> {
        let body = self.build_request(agent, input)?;
        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(agent = agent.name(), model = %self.model, "Calling chat-completions endpoint");
        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.endpoint()))?
            .error_for_status()
            .context("Reasoning endpoint returned an error status")?
            .json::<ChatResponse>()
            .await
            .context("Failed to decode chat-completions response")?;

        Ok(RawOutput::Text(reply_content(response)?))
    }
}
