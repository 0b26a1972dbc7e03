//! Agent loop - multi-turn tool calling over the data dictionary

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use ukbsearch_config::{Config, Language};
use ukbsearch_provider::{ChatParams, Message, Provider, ToolChoice};

use crate::envelope::{ErrorNormalizer, ResponseEnvelope};
use crate::language::LanguageDetector;
use crate::prompts::PromptStore;
use crate::tools::ToolRegistry;
use crate::{Result, SearchError};

/// Default number of model round-trips per query
pub const DEFAULT_MAX_ITERATIONS: u32 = 6;

/// Per-agent knobs
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model name; empty means the provider's default
    pub model: String,
    pub max_iterations: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Expose unexpected error internals in envelopes
    pub debug: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: 4096,
            temperature: 0.4,
            debug: false,
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.api.model.clone(),
            max_iterations: config.agent.max_iterations,
            max_tokens: config.api.max_tokens,
            temperature: config.api.temperature,
            debug: config.debug,
        }
    }
}

/// How a completed run ended
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    pub answer: String,
    pub language: Language,
    /// Model round-trips performed
    pub iterations: u32,
    /// True when the budget ran out before a tool-free reply
    pub exhausted: bool,
}

/// Answers questions about the data dictionary by letting the model call
/// dictionary tools until it produces a tool-free reply.
///
/// One instance is shared by every query in the process; each call to
/// [`DictionaryAgent::run`] owns its own transcript.
pub struct DictionaryAgent<P: Provider> {
    provider: Arc<P>,
    tools: ToolRegistry,
    prompts: Arc<PromptStore>,
    detector: LanguageDetector,
    normalizer: ErrorNormalizer,
    settings: AgentSettings,
}

impl<P: Provider> DictionaryAgent<P> {
    pub fn new(provider: P, tools: ToolRegistry, settings: AgentSettings) -> Self {
        Self::with_shared_provider(Arc::new(provider), tools, settings)
    }

    pub fn with_shared_provider(
        provider: Arc<P>,
        tools: ToolRegistry,
        settings: AgentSettings,
    ) -> Self {
        let prompts = Arc::new(PromptStore::default());
        Self {
            provider,
            tools,
            normalizer: ErrorNormalizer::new(prompts.clone(), settings.debug),
            prompts,
            detector: LanguageDetector::default(),
            settings,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptStore) -> Self {
        self.prompts = Arc::new(prompts);
        self.normalizer = ErrorNormalizer::new(self.prompts.clone(), self.settings.debug);
        self
    }

    pub fn with_detector(mut self, detector: LanguageDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn detect_language(&self, query: &str) -> Language {
        self.detector.detect(query)
    }

    fn model(&self) -> String {
        if self.settings.model.is_empty() {
            self.provider.default_model()
        } else {
            self.settings.model.clone()
        }
    }

    /// Answer `query`, returning the raw answer text.
    ///
    /// Exhausting the iteration budget is not an error; the language's
    /// "too many rounds" reply is returned instead.
    pub async fn run(
        &self,
        query: &str,
        system_prompt: Option<&str>,
        language: Option<Language>,
    ) -> Result<String> {
        self.run_detailed(query, system_prompt, language)
            .await
            .map(|run| run.answer)
    }

    /// Like [`DictionaryAgent::run`], also reporting iteration count and exhaustion
    pub async fn run_detailed(
        &self,
        query: &str,
        system_prompt: Option<&str>,
        language: Option<Language>,
    ) -> Result<AgentRun> {
        let language = language.unwrap_or_else(|| self.detector.detect(query));
        let system = match system_prompt {
            Some(prompt) => prompt.to_string(),
            None => self.prompts.system_prompt(language)?,
        };

        let mut messages = vec![Message::system(system), Message::user(query)];
        let model = self.model();
        let tools = self.tools.definitions();

        let start = Instant::now();
        info!(
            "Starting agent run - Language: {} - Query: {}",
            language,
            truncate(query, 100)
        );

        for iteration in 1..=self.settings.max_iterations {
            debug!("Agent iteration {}", iteration);

            let params = ChatParams {
                model: model.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                tool_choice: ToolChoice::Auto,
            };

            let response = self.provider.chat(params).await.map_err(|e| {
                error!("Error in agent iteration {}: {}", iteration, e);
                SearchError::from(e)
            })?;

            if !response.has_tool_calls() {
                info!(
                    "Agent completed - Duration: {:.3}s - Iterations: {}",
                    start.elapsed().as_secs_f64(),
                    iteration
                );
                return Ok(AgentRun {
                    answer: response.content.unwrap_or_default(),
                    language,
                    iterations: iteration,
                    exhausted: false,
                });
            }

            for call in &response.tool_calls {
                debug!("Dispatching tool: {}", call.name);
                let result = match self.tools.dispatch(&call.name, &call.arguments).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("Tool call '{}' failed: {}", call.name, e);
                        e.tool_payload()
                    }
                };
                messages.push(Message::tool(&call.id, &call.name, result));
            }

            messages.push(Message::assistant(response.content.unwrap_or_default()));
        }

        warn!(
            "Agent reached max iterations - Duration: {:.3}s - Iterations: {}",
            start.elapsed().as_secs_f64(),
            self.settings.max_iterations
        );
        Ok(AgentRun {
            answer: self.prompts.too_many_rounds(language),
            language,
            iterations: self.settings.max_iterations,
            exhausted: true,
        })
    }

    /// Answer `query` and wrap the outcome in an envelope; never fails
    pub async fn run_safe(
        &self,
        query: &str,
        system_prompt: Option<&str>,
        language: Option<Language>,
    ) -> ResponseEnvelope {
        let language = language.unwrap_or_else(|| self.detector.detect(query));

        match self.run(query, system_prompt, Some(language)).await {
            Ok(answer) => ResponseEnvelope::success(query, answer, language),
            Err(e) => {
                if let SearchError::Unexpected { .. } = e {
                    error!("Unexpected error in run_safe: {:?}", e);
                } else {
                    warn!("Query failed with {}: {}", e.code(), e);
                }
                self.normalizer.to_envelope(&e, language).with_query(query)
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
