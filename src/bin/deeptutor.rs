use clap::{Parser, Subcommand};
use deeptutor::{
    AppState, Error,
    config::{AppConfig, ProcessEnv},
    logging,
    pipeline::PipelineOptions,
    realtimex::ApplyError,
    selection::ConfigType,
};
use serde::Serialize;
use std::{path::PathBuf, str::FromStr};
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List RAG pipeline providers
    Pipelines {
        /// Include providers whose backend is not compiled in
        #[arg(long)]
        all: bool,
    },

    /// Show the RealTimeX connection status
    Status {
        /// Re-run detection instead of using the cached result
        #[arg(long)]
        force: bool,
    },

    /// List LLM and embedding providers offered by RealTimeX
    Providers,

    /// Search a knowledge base with a pipeline
    Search {
        kb_name: String,
        query: String,

        /// Pipeline id, defaults to the configured pipeline
        #[arg(long)]
        pipeline: Option<String>,

        #[arg(long, default_value_t = 5)]
        top_k: u64,
    },

    /// Manage the persisted provider/model selection
    Selection {
        #[command(subcommand)]
        command: SelectionCommands,
    },
}

#[derive(Subcommand)]
enum SelectionCommands {
    /// Show the active selection for a config type
    Get { config_type: String },
    /// Set the active selection for a config type
    Set {
        config_type: String,
        provider: String,
        model: String,
    },
    /// Remove the active selection for a config type
    Clear { config_type: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Error::internal(format!("Failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn parse_config_type(value: &str) -> Result<ConfigType, Error> {
    ConfigType::from_str(value).map_err(|_| ApplyError::InvalidConfigType(value.to_string()).into())
}

fn load_config(cli: &Cli) -> Result<AppConfig, Error> {
    let mut config = AppConfig::load(&cli.config, &ProcessEnv)?;
    if cli.verbose {
        config.logging.level = "DEBUG".to_string();
    }
    Ok(config)
}

async fn handle_selection_commands(
    command: &SelectionCommands,
    state: &AppState,
) -> Result<(), Error> {
    match command {
        SelectionCommands::Get { config_type } => {
            let config_type = parse_config_type(config_type)?;
            print_json(&state.selection.get(config_type))
        }
        SelectionCommands::Set {
            config_type,
            provider,
            model,
        } => {
            let config_type = parse_config_type(config_type)?;
            let saved = state.selection.set(config_type, provider, model);
            print_json(&serde_json::json!({ "success": saved }))
        }
        SelectionCommands::Clear { config_type } => {
            let config_type = parse_config_type(config_type)?;
            let cleared = state.selection.clear(config_type);
            print_json(&serde_json::json!({ "success": cleared }))
        }
    }
}

async fn run(cli: &Cli, state: &AppState) -> Result<(), Error> {
    match &cli.command {
        Commands::Pipelines { all } => print_json(&state.registry.list(*all)),
        Commands::Status { force } => {
            if *force {
                state.realtimex.clear_detection_cache();
            }
            print_json(&state.realtimex.status().await)
        }
        Commands::Providers => print_json(&*state.providers.get(&state.realtimex).await),
        Commands::Search {
            kb_name,
            query,
            pipeline,
            top_k,
        } => {
            let mut options = PipelineOptions::new();
            options.insert("top_k".to_string(), (*top_k).into());
            let pipeline = state.pipeline(pipeline.as_deref(), &options)?;
            let result = pipeline
                .search(query, kb_name, Default::default(), &options)
                .await?;
            print_json(&result)
        }
        Commands::Selection { command } => handle_selection_commands(command, state).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = logging::init(&config.logging, None) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    info!("config loaded.");
    debug!("config: {:?}", config);

    let state = AppState::new(config);
    if let Err(e) = run(&cli, &state).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
