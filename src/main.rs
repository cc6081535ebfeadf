//! # QBot CLI (`qbot`)
//!
//! Thin command-line wiring around [`qbot_rag::engine::RetrievalEngine`].
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qbot build [--force]` | Build the index if stale (or unconditionally) |
//! | `qbot ask "<question>" [--sources]` | Answer a question |
//! | `qbot search "<query>"` | Show the chunks retrieval would use |
//! | `qbot stats [--json]` | Show index state and counts |
//!
//! ## Examples
//!
//! ```bash
//! qbot build --config ./config/qbot.toml
//! qbot ask "Vịnh Hạ Long có gì đẹp?"
//! qbot search "Cô Tô beaches"
//! RUST_LOG=qbot_rag=debug qbot stats --json
//! ```
//!
//! Logs go to stderr; answers and reports go to stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use qbot_rag::config;
use qbot_rag::engine::RetrievalEngine;
use qbot_rag::models::SourceRef;

/// QBot answers travel questions from a local document corpus.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/qbot.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "qbot",
    about = "QBot — retrieval-augmented answers over a local document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/qbot.toml`. A missing file means built-in
    /// defaults: corpus in `./data`, index in `./vectorstore`.
    #[arg(long, global = true, default_value = "./config/qbot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the corpus directory.
    ///
    /// Does nothing when the persisted index is current.
    Build {
        /// Rebuild even if the index is current.
        #[arg(long)]
        force: bool,
    },

    /// Answer a question.
    Ask {
        question: String,

        /// Also print the source snippets given to the model.
        #[arg(long)]
        sources: bool,
    },

    /// Rank corpus chunks against a query without calling the chat model.
    Search { query: String },

    /// Show index statistics.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config_or_default(&cli.config)?;
    let engine = RetrievalEngine::new(cfg).context("Failed to initialize engine")?;

    match cli.command {
        Commands::Build { force } => {
            engine
                .ensure_index_ready(force)
                .await
                .context("Index build failed")?;
            let stats = engine.stats();
            println!(
                "Index ready: {} documents, {} chunks ({}).",
                stats.document_count, stats.chunk_count, stats.embedding_model
            );
        }
        Commands::Ask { question, sources } => {
            let answer = engine.query_with_sources(&question).await;
            println!("{}", answer.answer);
            if sources {
                print_sources(&answer.sources);
            }
        }
        Commands::Search { query } => {
            let results = engine.search(&query).await?;
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [{:.2}] {} #{}",
                    i + 1,
                    result.similarity_score,
                    result.chunk.source_label,
                    result.chunk.sequence_index
                );
                println!(
                    "    excerpt: \"{}\"",
                    SourceRef::from(result).snippet.replace('\n', " ").trim()
                );
                println!("    id: {}", result.chunk.id);
                println!();
            }
        }
        Commands::Stats { json } => {
            let stats = engine.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats.render());
            }
        }
    }

    Ok(())
}

fn print_sources(sources: &[SourceRef]) {
    if sources.is_empty() {
        println!();
        println!("Sources: none");
        return;
    }
    println!();
    println!("Sources:");
    for (i, source) in sources.iter().enumerate() {
        println!("  {}. {}", i + 1, source.source_label);
        println!("     \"{}\"", source.snippet.replace('\n', " ").trim());
    }
}
