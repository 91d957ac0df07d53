//! ollama-research command-line entry point.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ollama_research::inference::config::load_client_config;
use ollama_research::inference::{ClientConfig, DisplayMode, InferenceClient};
use ollama_research::knowledge;

#[derive(Debug, Parser)]
#[command(name = "ollama-research", version, about = "Research helpers for a local Ollama server")]
struct Args {
    /// Config file (default: search for ollama-research.yaml).
    #[arg(long, global = true, env = "OLLAMA_RESEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Model to use instead of the configured one.
    #[arg(long, short, global = true)]
    model: Option<String>,

    /// Username recorded with each interaction.
    #[arg(long, short, global = true)]
    user: Option<String>,

    /// Do not stream the response to the terminal.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send a free-form prompt and stream the reply.
    Prompt { text: String },
    /// Classify a query into a topic.
    Classify { query: String },
    /// List alternative topics for a query.
    Alternatives { query: String },
    /// Estimate research depth (1-5) for a query.
    Depth { query: String },
    /// Score the credibility of a source (0-1).
    Credibility { source: String },
    /// Add information to the knowledge base for a topic.
    Update { topic: String, info: String },
    /// Check that the inference server is reachable.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = ollama_research::data_dir();
    if let Err(e) = ollama_research::init_tracing(&log_dir) {
        eprintln!("warning: file logging disabled: {e}");
    }

    let config = load_config(&args)?;
    let model = args.model.clone().unwrap_or_else(|| config.model.clone());
    let username = args.user.clone().unwrap_or_else(|| config.username.clone());

    let mut client = InferenceClient::new(config).context("failed to create inference client")?;
    if args.quiet {
        client = client.with_display_mode(DisplayMode::Quiet);
    }

    match args.command {
        Commands::Prompt { text } => {
            let response = client.generate(&text, &model, &username).await?;
            let streamed = match client.display_mode() {
                DisplayMode::Live => true,
                DisplayMode::Auto => std::io::stdout().is_terminal(),
                DisplayMode::Quiet => false,
            };
            if !streamed {
                println!("{response}");
            }
        }
        Commands::Classify { query } => {
            let classification = knowledge::classify_query(&client, &query, &model).await?;
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        Commands::Alternatives { query } => {
            for topic in knowledge::get_alternative_topics(&client, &query, &model).await? {
                println!("{topic}");
            }
        }
        Commands::Depth { query } => {
            let depth = knowledge::determine_research_depth(&client, &query, &model).await;
            println!("{depth}");
        }
        Commands::Credibility { source } => {
            let score = knowledge::assess_source_credibility(&client, &source, &model).await?;
            println!("{score}");
        }
        Commands::Update { topic, info } => {
            knowledge::update_knowledge_base(&client, &info, &topic, &model).await?;
            println!("knowledge base updated for '{topic}'");
        }
        Commands::Health => {
            let healthy = client.health_check().await;
            println!(
                "{} {}",
                client.base_url(),
                if healthy { "reachable" } else { "unreachable" }
            );
            if !healthy {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    match &args.config {
        Some(path) => load_client_config(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("cannot determine current directory")?;
            ClientConfig::load_or_default(&cwd).context("failed to load config")
        }
    }
}
