//! ukbsearch - ask questions about the UK Biobank data dictionary

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use ukbsearch_config::{Config, Language};

mod commands;

use commands::{
    ask_command, call_command, guide_command, init_command, init_db_command, status_command,
    tools_command,
};

/// UK Biobank data dictionary assistant
#[derive(Parser)]
#[command(name = "ukbsearch")]
#[command(about = "Ask questions about the UK Biobank data dictionary")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file with defaults
    Init,
    /// Ask a question and print the response envelope
    Ask {
        /// The question
        query: String,
        /// Replace the default system prompt
        #[arg(long)]
        system_prompt: Option<String>,
        /// Answer language (zh or en); detected from the query if omitted
        #[arg(short, long)]
        lang: Option<Language>,
    },
    /// List the tools offered to the model
    Tools,
    /// Run one tool directly
    Call {
        /// Tool name, e.g. explain_field_by_id
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
    /// Show configuration and check the dictionary database
    Status,
    /// Print the usage guide
    Guide {
        #[arg(short, long, default_value = "zh")]
        lang: Language,
    },
    /// Create the dictionary schema, optionally loading a SQL dump
    InitDb {
        /// SQL file to execute after creating the schema
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool, config: &Config) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A broken config file is reported by the command that needs it
    let config = match Config::load().await {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Warning: could not load config: {}", e);
            None
        }
    };
    init_tracing(cli.verbose, config.as_ref().unwrap_or(&Config::default()));

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Ask {
            query,
            system_prompt,
            lang,
        } => ask_command(config, query, system_prompt, lang).await,
        Commands::Tools => tools_command(),
        Commands::Call { tool, args } => call_command(config, tool, args).await,
        Commands::Status => status_command(config).await,
        Commands::Guide { lang } => guide_command(lang),
        Commands::InitDb { from } => init_db_command(config, from).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
