//! LLM transport for the dictionary assistant
//!
//! Chat-completion wire types, the [`Provider`] trait, the GLM
//! (OpenAI-compatible) HTTP provider and a local request rate limiter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thiserror::Error;

pub mod glm;
pub mod rate_limit;

pub use glm::GlmProvider;
pub use rate_limit::{RateLimiter, ThrottledProvider};

/// Transport errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Api {
        status: Option<u16>,
        message: String,
    },

    #[error("no API key configured")]
    NoApiKey,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("invalid response from API")]
    InvalidResponse,

    #[error("API rate limit exceeded")]
    RateLimited,

    #[error("rate limit exceeded: maximum {limit} requests per minute")]
    Throttled { limit: u32, retry_after: u64 },
}

impl ProviderError {
    /// Seconds the caller should wait before retrying, when known
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ProviderError::Throttled { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// HTTP status behind the failure, when known
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => *status,
            ProviderError::Request(e) => e.status().map(|s| s.as_u16()),
            ProviderError::InvalidApiKey => Some(401),
            ProviderError::RateLimited => Some(429),
            _ => None,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::Throttled { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// A tool invocation proposed by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One model turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    pub fn with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content,
            tool_calls,
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }
}

/// Token accounting reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Conversation roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result.into()),
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
        }
    }
}

/// Tool specification sent to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Request parameters
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub tool_choice: ToolChoice,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: 4096,
            temperature: 0.4,
            tool_choice: ToolChoice::Auto,
        }
    }
}

/// Tool selection mode
#[derive(Debug, Clone)]
pub enum ToolChoice {
    Auto,
    Required(String),
    None,
}

/// Chat-completion backend
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for std::sync::Arc<P> {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        (**self).chat(params).await
    }

    fn default_model(&self) -> String {
        (**self).default_model()
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_error_display() {
        assert_eq!(ProviderError::NoApiKey.to_string(), "no API key configured");
        assert_eq!(ProviderError::InvalidApiKey.to_string(), "invalid API key");
        assert_eq!(
            ProviderError::ModelNotFound("glm-x".to_string()).to_string(),
            "model 'glm-x' not found"
        );

        let err = ProviderError::Api {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error (500): boom");

        let err = ProviderError::Api {
            status: None,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error: boom");

        let err = ProviderError::Throttled {
            limit: 60,
            retry_after: 60,
        };
        assert_eq!(
            err.to_string(),
            "rate limit exceeded: maximum 60 requests per minute"
        );
    }

    #[test]
    fn test_provider_error_metadata() {
        let throttled = ProviderError::Throttled {
            limit: 2,
            retry_after: 42,
        };
        assert_eq!(throttled.retry_after(), Some(42));
        assert!(throttled.is_rate_limit());
        assert!(ProviderError::RateLimited.is_rate_limit());
        assert_eq!(ProviderError::RateLimited.status_code(), Some(429));
        assert!(!ProviderError::InvalidResponse.is_rate_limit());
        assert_eq!(ProviderError::InvalidResponse.status_code(), None);
    }

    #[test]
    fn test_chat_response_builders() {
        let response = ChatResponse::text("Hello");
        assert_eq!(response.content.as_deref(), Some("Hello"));
        assert!(!response.has_tool_calls());
        assert_eq!(response.finish_reason, "stop");

        let response = ChatResponse::with_tool_calls(
            None,
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "explain_field_by_id".to_string(),
                arguments: json!({"field_id": 31}),
            }],
        );
        assert!(response.has_tool_calls());
        assert!(response.content.is_none());
        assert_eq!(response.finish_reason, "tool_calls");
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::system("sys");
        assert_eq!(msg.role, Role::System);
        assert!(msg.tool_call_id.is_none());

        let msg = Message::tool("call_9", "get_all_categories", "[]");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.content.as_deref(), Some("[]"));
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(msg.name.as_deref(), Some("get_all_categories"));
    }

    #[test]
    fn test_message_serialization_skips_empty_fields() {
        let json_str = serde_json::to_string(&Message::user("Hello")).unwrap();
        assert_eq!(json_str, r#"{"role":"user","content":"Hello"}"#);
    }

    #[test]
    fn test_tool_serialization() {
        let tool = Tool::new("get_all_categories", "List categories", json!({}));
        let json_str = serde_json::to_string(&tool).unwrap();
        assert!(json_str.contains("\"type\":\"function\""));
        assert!(json_str.contains("\"name\":\"get_all_categories\""));
    }

    #[test]
    fn test_chat_params_default() {
        let params = ChatParams::default();
        assert!(params.messages.is_empty());
        assert_eq!(params.max_tokens, 4096);
        assert_eq!(params.temperature, 0.4);
        assert!(matches!(params.tool_choice, ToolChoice::Auto));
    }
}
