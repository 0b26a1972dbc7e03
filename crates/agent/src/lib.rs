//! UK Biobank dictionary assistant core
//!
//! The tool-calling loop, its dispatch table, prompts, language detection
//! and the error taxonomy that turns failures into response envelopes.

pub mod envelope;
pub mod error;
pub mod language;
pub mod loop_agent;
pub mod prompts;
pub mod tools;

pub use envelope::{ErrorNormalizer, ResponseEnvelope};
pub use error::{Result, SearchError};
pub use language::LanguageDetector;
pub use loop_agent::{AgentRun, AgentSettings, DictionaryAgent};
pub use prompts::{PromptStore, PromptTemplate};
pub use tools::{ParamKind, ParamSpec, ToolArgs, ToolDescriptor, ToolRegistry, ToolTrait};

pub use ukbsearch_config::Language;
