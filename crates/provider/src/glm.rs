//! GLM chat-completion provider
//!
//! Talks to the Zhipu GLM endpoint, or any OpenAI-compatible base URL.

use std::time::{Duration, Instant};

use crate::*;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, error, info, trace};

/// Default GLM API base
pub const DEFAULT_API_BASE: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Default GLM model
pub const DEFAULT_MODEL: &str = "glm-4.5-flash";

const PLACEHOLDER_API_KEY: &str = "your-api-key-here";

/// GLM provider
#[derive(Debug)]
pub struct GlmProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl GlmProvider {
    /// Create a provider; fails when the key is empty or the placeholder
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() || api_key == PLACEHOLDER_API_KEY {
            return Err(ProviderError::NoApiKey);
        }

        let api_base = api_base
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let default_model = default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = Client::builder().timeout(timeout).build()?;

        info!("GLM provider initialized - model: {}", default_model);

        Ok(Self {
            client,
            api_key,
            api_base,
            default_model,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let mut body = json!({
            "model": model,
            "messages": params.messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "thinking": {"type": "disabled"},
        });

        if !params.tools.is_empty() {
            body["tools"] = json!(params.tools);
            body["tool_choice"] = match &params.tool_choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::Required(name) => {
                    json!({"type": "function", "function": {"name": name}})
                }
                ToolChoice::None => json!("none"),
            };
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let message = &choice["message"];
        let content = message["content"].as_str().map(|s| s.to_string());
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let function = &call["function"];
                let args = match &function["arguments"] {
                    serde_json::Value::String(raw) if raw.trim().is_empty() => json!({}),
                    serde_json::Value::String(raw) => serde_json::from_str(raw)
                        .unwrap_or_else(|_| serde_json::Value::String(raw.clone())),
                    serde_json::Value::Null => json!({}),
                    other => other.clone(),
                };

                tool_calls.push(ToolCall {
                    id: call["id"].as_str().unwrap_or("").to_string(),
                    name: function["name"].as_str().unwrap_or("").to_string(),
                    arguments: args,
                });
            }
        }

        let usage = if let Some(usage) = json["usage"].as_object() {
            let count = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: count("prompt_tokens"),
                completion_tokens: count("completion_tokens"),
                total_tokens: count("total_tokens"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            usage,
        })
    }

    async fn send(&self, params: &ChatParams) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(params);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
                .unwrap_or_else(|| text.clone());
            return Err(classify_failure(status, &message, &body["model"]));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;

        debug!(
            "GLM response: {} tool calls",
            json["choices"][0]["message"]["tool_calls"]
                .as_array()
                .map(|v| v.len())
                .unwrap_or(0)
        );

        self.parse_response(json)
    }
}

/// Map a failed HTTP exchange onto a transport error kind
pub fn classify_failure(
    status: StatusCode,
    message: &str,
    model: &serde_json::Value,
) -> ProviderError {
    let lower = message.to_lowercase();
    let model = model.as_str().unwrap_or_default().to_string();

    if status == StatusCode::TOO_MANY_REQUESTS || lower.contains("rate limit") {
        ProviderError::RateLimited
    } else if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || lower.contains("invalid api key")
    {
        ProviderError::InvalidApiKey
    } else if status == StatusCode::NOT_FOUND || lower.contains("model not found") {
        ProviderError::ModelNotFound(model)
    } else {
        ProviderError::Api {
            status: Some(status.as_u16()),
            message: message.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for GlmProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        trace!("Sending chat completion to {}", self.api_base);

        let started = Instant::now();
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        match self.send(&params).await {
            Ok(response) => {
                info!(
                    "GLM API success - model: {} - tokens: {} - duration: {:.3}s",
                    model,
                    response.usage.total_tokens,
                    started.elapsed().as_secs_f64()
                );
                Ok(response)
            }
            Err(e) => {
                error!(
                    "GLM API failed - model: {} - duration: {:.3}s - error: {}",
                    model,
                    started.elapsed().as_secs_f64(),
                    e
                );
                Err(e)
            }
        }
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
