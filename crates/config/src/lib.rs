//! Configuration management for ukbsearch
//!
//! Settings are read from `~/.ukbsearch/config.json` (defaults when absent)
//! and then overridden from the process environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, expand_home};

/// Placeholder key shipped in example env files
pub const PLACEHOLDER_API_KEY: &str = "your-api-key-here";

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),

    #[error("configuration validation failed:\n{}", format_problems(.0))]
    Invalid(Vec<String>),
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|p| format!("- {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Response language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh" => Ok(Language::Chinese),
            "en" => Ok(Language::English),
            other => Err(format!("unsupported language '{}', expected zh or en", other)),
        }
    }
}

/// LLM endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            api_base: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            rate_limit_per_minute: default_rate_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "glm-4.5-flash".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.4
}

fn default_rate_limit() -> u32 {
    60
}

fn default_timeout_secs() -> u64 {
    60
}

/// Orchestration loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_language_threshold")]
    pub language_threshold: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            language_threshold: default_language_threshold(),
        }
    }
}

fn default_max_iterations() -> u32 {
    6
}

fn default_language_threshold() -> f64 {
    0.3
}

/// Dictionary database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

fn default_db_path() -> String {
    "./ukb_datadict.db".to_string()
}

fn default_busy_timeout() -> u64 {
    30
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_true")]
    pub enable_rate_limiting: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            agent: AgentConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            debug: false,
            enable_rate_limiting: true,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub async fn load() -> Result<Self> {
        let path = config_path();
        let mut config = Self::load_from(&path).await?;
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific location without environment overrides
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GLM_API_KEY") {
            self.api.api_key = v;
        }
        if let Some(v) = lookup("GLM_MODEL") {
            self.api.model = v;
        }
        if let Some(v) = lookup("GLM_BASE_URL") {
            self.api.api_base = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("DB_PATH") {
            self.database.path = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }

        override_parsed(&lookup, "MAX_TOKENS", &mut self.api.max_tokens);
        override_parsed(&lookup, "TEMPERATURE", &mut self.api.temperature);
        override_parsed(
            &lookup,
            "RATE_LIMIT_PER_MINUTE",
            &mut self.api.rate_limit_per_minute,
        );
        override_parsed(&lookup, "MAX_ITERATIONS", &mut self.agent.max_iterations);
        override_flag(&lookup, "DEBUG", &mut self.debug);
        override_flag(
            &lookup,
            "ENABLE_RATE_LIMITING",
            &mut self.enable_rate_limiting,
        );
    }

    /// Check that the configuration can serve queries
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if !self.has_api_key() {
            problems.push("GLM_API_KEY is required and must be set to a valid API key".to_string());
        }

        let db_path = self.database_path();
        if !db_path.exists() {
            problems.push(format!("Database file not found: {}", db_path.display()));
        }

        if self.api.rate_limit_per_minute == 0 {
            problems.push("rate_limit_per_minute must be greater than zero".to_string());
        }

        if self.agent.max_iterations == 0 {
            problems.push("max_iterations must be greater than zero".to_string());
        }

        if !(0.0..=1.0).contains(&self.agent.language_threshold) {
            problems.push(format!(
                "language_threshold must be within [0, 1], got {}",
                self.agent.language_threshold
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// API key, unless unset or still the placeholder
    pub fn api_key(&self) -> Option<String> {
        let key = self.api.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            None
        } else {
            Some(key.to_string())
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Database location with `~` expanded
    pub fn database_path(&self) -> PathBuf {
        expand_home(&self.database.path)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring unparseable {}={:?}", key, raw),
        }
    }
}

fn override_flag<F>(lookup: &F, key: &str, target: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match parse_flag(&raw) {
            Some(value) => *target = value,
            None => warn!("Ignoring unparseable {}={:?}", key, raw),
        }
    }
}

/// Parse a boolean switch the way `.env` files spell them
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

/// Write the default config unless one already exists, then load it
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("Config already present at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("Config created at {:?}", config_path);
    }

    Config::load().await
}
