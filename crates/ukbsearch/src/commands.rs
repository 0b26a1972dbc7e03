//! ukbsearch command implementations

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use ukbsearch_agent::tools::DESCRIPTORS;
use ukbsearch_agent::{AgentSettings, DictionaryAgent, LanguageDetector, PromptStore, ToolRegistry};
use ukbsearch_config::{self, Config, Language};
use ukbsearch_dictionary::{DictionaryStore, SqliteDictionary};
use ukbsearch_provider::{GlmProvider, Provider, RateLimiter, ThrottledProvider};

type SharedProvider = Arc<dyn Provider>;

fn loaded(config: Option<Config>) -> Result<Config> {
    config.context("Config could not be loaded. Fix or remove ~/.ukbsearch/config.json")
}

fn open_dictionary(config: &Config) -> Result<Arc<SqliteDictionary>> {
    let path = config.database_path();
    let store = SqliteDictionary::open(
        &path,
        Duration::from_secs(config.database.busy_timeout_secs),
    )
    .with_context(|| format!("Cannot open dictionary at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// GLM transport, behind the shared rate limiter when enabled
fn build_provider(config: &Config) -> Result<SharedProvider> {
    let api_key = config
        .api_key()
        .context("No API key configured. Set GLM_API_KEY or api.api_key in ~/.ukbsearch/config.json")?;

    let glm = GlmProvider::new(
        api_key,
        config.api.api_base.clone(),
        Some(config.api.model.clone()),
        Duration::from_secs(config.api.timeout_secs),
    )?;

    if config.enable_rate_limiting {
        let limiter = Arc::new(RateLimiter::per_minute(config.api.rate_limit_per_minute));
        debug!(
            "Rate limiting enabled: {} requests per minute",
            limiter.limit()
        );
        Ok(Arc::new(ThrottledProvider::new(glm, limiter)))
    } else {
        Ok(Arc::new(glm))
    }
}

fn build_agent(config: &Config) -> Result<DictionaryAgent<SharedProvider>> {
    let provider = build_provider(config)?;
    let store: Arc<dyn DictionaryStore> = open_dictionary(config)?;
    let tools = ToolRegistry::with_dictionary(store);

    Ok(
        DictionaryAgent::new(provider, tools, AgentSettings::from_config(config))
            .with_detector(LanguageDetector::new(config.agent.language_threshold)),
    )
}

/// Create the config file
pub async fn init_command() -> Result<()> {
    println!("Initializing ukbsearch...");

    let config = ukbsearch_config::init().await?;

    println!("Config: {}", ukbsearch_config::config_path().display());
    println!("\nNext steps:");
    if !config.has_api_key() {
        println!("  1. Add your GLM API key to the config file (or set GLM_API_KEY)");
    }
    println!(
        "  2. Place the dictionary database at {} (or run: ukbsearch init-db --from dump.sql)",
        config.database_path().display()
    );
    println!("  3. Ask away: ukbsearch ask \"What does field 31 mean?\"");

    Ok(())
}

/// Answer one question and print the envelope
pub async fn ask_command(
    config: Option<Config>,
    query: String,
    system_prompt: Option<String>,
    lang: Option<Language>,
) -> Result<()> {
    let config = loaded(config)?;
    let agent = build_agent(&config)?;
    let lang = lang.unwrap_or_else(|| agent.detect_language(&query));
    debug!("Answering in {}", lang);

    let envelope = agent
        .run_safe(&query, system_prompt.as_deref(), Some(lang))
        .await;
    info!("Query finished - ok: {}", envelope.ok);

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Print every tool descriptor
pub fn tools_command() -> Result<()> {
    let tools: Vec<Value> = DESCRIPTORS
        .iter()
        .map(|d| {
            json!({
                "name": d.name,
                "description": d.description,
                "parameters": d.schema(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}

/// Run one tool without the model
pub async fn call_command(config: Option<Config>, tool: String, args: String) -> Result<()> {
    let config = loaded(config)?;
    let args: Value = serde_json::from_str(&args).context("--args must be valid JSON")?;

    let store: Arc<dyn DictionaryStore> = open_dictionary(&config)?;
    let registry = ToolRegistry::with_dictionary(store);

    match registry.dispatch(&tool, &args).await {
        Ok(result) => {
            let value: Value = serde_json::from_str(&result)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", e.tool_payload());
            bail!("{} ({})", e, e.code())
        }
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "[OK]"
    } else {
        "[FAIL]"
    }
}

/// Show configuration and run dictionary smoke checks
pub async fn status_command(config: Option<Config>) -> Result<()> {
    let config_path = ukbsearch_config::config_path();

    println!("ukbsearch status");
    println!("----------------");
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = loaded(config)?;
    println!("Model:     {}", config.api.model);
    println!(
        "API Key:   {}",
        if config.has_api_key() {
            "[Set]"
        } else {
            "[Missing]"
        }
    );
    println!(
        "Rate limit: {}",
        if config.enable_rate_limiting {
            format!("{} requests/minute", config.api.rate_limit_per_minute)
        } else {
            "disabled".to_string()
        }
    );
    println!("Max iterations: {}", config.agent.max_iterations);

    let db_path = config.database_path();
    println!("Database:  {}", db_path.display());

    let store = match open_dictionary(&config) {
        Ok(store) => {
            println!("  connection          {}", mark(true));
            store
        }
        Err(e) => {
            println!("  connection          {} {:#}", mark(false), e);
            if let Err(e) = config.validate() {
                println!("\n{}", e);
            }
            return Ok(());
        }
    };

    let field = store.explain_field(31);
    println!(
        "  field 31            {} {}",
        mark(field.is_ok()),
        field.map(|f| f.title).unwrap_or_else(|e| e.to_string())
    );

    let search = store.search_fields("heart", 5);
    println!(
        "  search \"heart\"      {} {}",
        mark(search.is_ok()),
        search
            .map(|r| format!("{} results", r.len()))
            .unwrap_or_else(|e| e.to_string())
    );

    let categories = store.all_categories();
    println!(
        "  categories          {} {}",
        mark(categories.is_ok()),
        categories
            .map(|c| format!("{} categories", c.len()))
            .unwrap_or_else(|e| e.to_string())
    );

    match config.validate() {
        Ok(()) => println!("\nReady"),
        Err(e) => println!("\n{}", e),
    }
    Ok(())
}

/// Print the usage guide
pub fn guide_command(lang: Language) -> Result<()> {
    let guide = PromptStore::default().usage_guide(lang)?;
    println!("{}", guide);
    Ok(())
}

/// Create the dictionary schema and optionally load a dump
pub async fn init_db_command(config: Option<Config>, from: Option<PathBuf>) -> Result<()> {
    let config = loaded(config)?;
    let path = config.database_path();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let store = SqliteDictionary::create(&path)
        .with_context(|| format!("Cannot create dictionary at {}", path.display()))?;
    println!("Schema ready at {}", path.display());

    if let Some(dump) = from {
        let sql = tokio::fs::read_to_string(&dump)
            .await
            .with_context(|| format!("Cannot read {}", dump.display()))?;
        store
            .execute_batch(&sql)
            .with_context(|| format!("Loading {} failed", dump.display()))?;
        println!("Loaded {}", dump.display());
    }

    Ok(())
}
