//! Search error taxonomy
//!
//! One flat enum; every variant carries a stable code, a kind name used in
//! tool error payloads, and a details map for the response envelope.

use serde_json::{json, Map, Value};
use thiserror::Error;

use ukbsearch_dictionary::DictionaryError;
use ukbsearch_provider::ProviderError;

/// Name reported as `api_name` for transport failures
pub const API_NAME: &str = "GLM";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("{message}")]
    Config { message: String },

    #[error("{message}")]
    Database {
        message: String,
        query: Option<String>,
    },

    #[error("{message}")]
    Api {
        message: String,
        api_name: Option<String>,
        status_code: Option<u16>,
    },

    #[error("{message}")]
    RateLimitExceeded {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
        value: Option<Value>,
    },

    #[error("Field {field_id} not found in database")]
    FieldNotFound { field_id: i64 },

    #[error("Encoding {encoding_id} not found in database")]
    EncodingNotFound { encoding_id: i64 },

    #[error("Category '{category_name}' not found in database")]
    CategoryNotFound { category_name: String },

    #[error("Tool '{tool_name}' not found")]
    ToolNotFound { tool_name: String },

    #[error("Tool '{tool_name}' execution failed: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("{message}")]
    Prompt {
        message: String,
        template_name: Option<String>,
    },

    #[error("{message}")]
    Unexpected { message: String },
}

impl SearchError {
    pub fn config(message: impl Into<String>) -> Self {
        SearchError::Config {
            message: message.into(),
        }
    }

    pub fn api(message: impl Into<String>, status_code: Option<u16>) -> Self {
        SearchError::Api {
            message: message.into(),
            api_name: Some(API_NAME.to_string()),
            status_code,
        }
    }

    pub fn validation(
        field: impl Into<String>,
        value: Option<Value>,
        message: impl Into<String>,
    ) -> Self {
        SearchError::Validation {
            message: message.into(),
            field: Some(field.into()),
            value,
        }
    }

    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        SearchError::Unexpected {
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::Config { .. } => "CONFIG_ERROR",
            SearchError::Database { .. } => "DATABASE_ERROR",
            SearchError::Api { .. } => "API_ERROR",
            SearchError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            SearchError::Validation { .. } => "VALIDATION_ERROR",
            SearchError::FieldNotFound { .. } => "FIELD_NOT_FOUND",
            SearchError::EncodingNotFound { .. } => "ENCODING_NOT_FOUND",
            SearchError::CategoryNotFound { .. } => "CATEGORY_NOT_FOUND",
            SearchError::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            SearchError::ToolExecution { .. } => "TOOL_EXECUTION_ERROR",
            SearchError::Prompt { .. } => "PROMPT_ERROR",
            SearchError::Unexpected { .. } => "UNEXPECTED_ERROR",
        }
    }

    /// Kind name, as shown to the model in `{"error": "<kind>: <message>"}`
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Config { .. } => "ConfigurationError",
            SearchError::Database { .. } => "DatabaseError",
            SearchError::Api { .. } => "ApiError",
            SearchError::RateLimitExceeded { .. } => "RateLimitError",
            SearchError::Validation { .. } => "ValidationError",
            SearchError::FieldNotFound { .. } => "FieldNotFoundError",
            SearchError::EncodingNotFound { .. } => "EncodingNotFoundError",
            SearchError::CategoryNotFound { .. } => "CategoryNotFoundError",
            SearchError::ToolNotFound { .. } => "ToolNotFoundError",
            SearchError::ToolExecution { .. } => "ToolExecutionError",
            SearchError::Prompt { .. } => "PromptError",
            SearchError::Unexpected { .. } => "UnexpectedError",
        }
    }

    /// Structured details; absent values are omitted
    pub fn details(&self) -> Map<String, Value> {
        let mut details = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                details.insert(key.to_string(), value);
            }
        };

        match self {
            SearchError::Config { .. } | SearchError::Unexpected { .. } => {}
            SearchError::Database { query, .. } => put("query", query.as_ref().map(|q| json!(q))),
            SearchError::Api {
                api_name,
                status_code,
                ..
            } => {
                put("api_name", api_name.as_ref().map(|n| json!(n)));
                put("status_code", status_code.map(|s| json!(s)));
            }
            SearchError::RateLimitExceeded { retry_after, .. } => {
                put("retry_after", retry_after.map(|s| json!(s)))
            }
            SearchError::Validation { field, value, .. } => {
                put("field", field.as_ref().map(|f| json!(f)));
                put("value", value.clone());
            }
            SearchError::FieldNotFound { field_id } => put("field_id", Some(json!(field_id))),
            SearchError::EncodingNotFound { encoding_id } => {
                put("encoding_id", Some(json!(encoding_id)))
            }
            SearchError::CategoryNotFound { category_name } => {
                put("category_name", Some(json!(category_name)))
            }
            SearchError::ToolNotFound { tool_name } | SearchError::ToolExecution { tool_name, .. } => {
                put("tool_name", Some(json!(tool_name)))
            }
            SearchError::Prompt { template_name, .. } => {
                put("template_name", template_name.as_ref().map(|t| json!(t)))
            }
        }

        details
    }

    /// Payload appended to the transcript in place of a tool result
    pub fn tool_payload(&self) -> String {
        json!({ "error": format!("{}: {}", self.kind(), self) }).to_string()
    }
}

impl From<ProviderError> for SearchError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Throttled { retry_after, .. } => SearchError::RateLimitExceeded {
                message: e.to_string(),
                retry_after: Some(retry_after),
            },
            ProviderError::RateLimited => SearchError::RateLimitExceeded {
                message: e.to_string(),
                retry_after: None,
            },
            ProviderError::NoApiKey => SearchError::config(e.to_string()),
            other => {
                let status = other.status_code();
                SearchError::api(other.to_string(), status)
            }
        }
    }
}

impl From<DictionaryError> for SearchError {
    fn from(e: DictionaryError) -> Self {
        match e {
            DictionaryError::FieldNotFound(field_id) => SearchError::FieldNotFound { field_id },
            DictionaryError::EncodingNotFound(encoding_id) => {
                SearchError::EncodingNotFound { encoding_id }
            }
            DictionaryError::CategoryNotFound(category_name) => {
                SearchError::CategoryNotFound { category_name }
            }
            DictionaryError::InvalidArgument { field, message } => SearchError::Validation {
                message: format!("invalid {}: {}", field, message),
                field: Some(field),
                value: None,
            },
            DictionaryError::Database { message, query } => {
                SearchError::Database { message, query }
            }
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        SearchError::unexpected(format!("serialization failed: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
