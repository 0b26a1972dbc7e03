//! Response envelope and error normalization

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use ukbsearch_config::Language;

use crate::prompts::{PromptStore, UNEXPECTED_ERROR};
use crate::SearchError;

/// Final result of one top-level query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub ok: bool,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Stable error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    pub language: Language,
}

impl ResponseEnvelope {
    pub fn success(query: impl Into<String>, answer: impl Into<String>, language: Language) -> Self {
        Self {
            ok: true,
            query: query.into(),
            answer: Some(answer.into()),
            error: None,
            message: None,
            details: None,
            language,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

/// Turns a [`SearchError`] into a language-appropriate envelope
#[derive(Debug, Clone)]
pub struct ErrorNormalizer {
    prompts: Arc<PromptStore>,
    debug: bool,
}

impl ErrorNormalizer {
    /// `debug` exposes the internals of unexpected errors in `details`
    pub fn new(prompts: Arc<PromptStore>, debug: bool) -> Self {
        Self { prompts, debug }
    }

    /// User-facing text for `error`
    pub fn message(&self, error: &SearchError, language: Language) -> String {
        let (key, vars) = match error {
            SearchError::FieldNotFound { field_id } => {
                ("field_not_found", vec![("field_id", field_id.to_string())])
            }
            SearchError::EncodingNotFound { encoding_id } => {
                ("encoding_not_found", vec![("encoding_id", encoding_id.to_string())])
            }
            SearchError::CategoryNotFound { category_name } => {
                ("category_not_found", vec![("category", category_name.clone())])
            }
            SearchError::RateLimitExceeded { .. } => ("rate_limit_exceeded", vec![]),
            SearchError::Unexpected { .. } => (UNEXPECTED_ERROR, vec![]),
            other => ("api_error", vec![("error", other.to_string())]),
        };
        self.prompts.error_message(key, language, &vars)
    }

    /// Envelope for a failed query; `query` is left empty, see [`ResponseEnvelope::with_query`]
    pub fn to_envelope(&self, error: &SearchError, language: Language) -> ResponseEnvelope {
        let details = match error {
            SearchError::Unexpected { message } if self.debug => {
                let mut details = Map::new();
                details.insert("error".to_string(), json!(message));
                details
            }
            SearchError::Unexpected { .. } => Map::new(),
            other => other.details(),
        };

        ResponseEnvelope {
            ok: false,
            query: String::new(),
            answer: None,
            error: Some(error.code().to_string()),
            message: Some(self.message(error, language)),
            details: Some(details),
            language,
        }
    }
}
