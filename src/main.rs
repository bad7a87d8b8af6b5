//! # docrag CLI
//!
//! ```bash
//! docrag --config ./config/docrag.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docrag serve` | Start the HTTP API |
//! | `docrag ingest <path>...` | Store, extract and index local files |
//! | `docrag query "<question>"` | Answer a question from the indexed documents |
//! | `docrag files` | List stored uploads |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `docrag=info,tower_http=info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docrag::config::{load_config, Config};
use docrag::engine::RagEngine;
use docrag::ingest::ingest_path;
use docrag::server::run_server;
use docrag::uploads::UploadStore;

/// Offline document question answering over PDFs, Word files and scanned images.
#[derive(Parser)]
#[command(name = "docrag", version)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when it does not exist.
    #[arg(long, global = true, default_value = "./config/docrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Ingest local files as if they had been uploaded.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a question and print the cited answer.
    Query {
        question: String,

        /// Print the raw JSON result instead of formatted text.
        #[arg(long)]
        json: bool,
    },

    /// List stored uploads.
    Files,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docrag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli.config)?;

    match cli.command {
        Commands::Serve => run_server(&config).await?,
        Commands::Ingest { paths } => {
            let engine = RagEngine::open(&config).await?;
            let uploads = UploadStore::new(config.uploads.dir.clone());
            let mut failed = 0usize;
            for path in &paths {
                match ingest_path(&engine, &uploads, path).await {
                    Ok(ack) => println!("{} ({} chunks)", ack.message, ack.chunks),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {:#}", path.display(), e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} files failed to ingest", failed, paths.len());
            }
        }
        Commands::Query { question, json } => {
            let engine = RagEngine::open(&config).await?;
            let result = engine.query(&question).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.answer.trim());
                if !result.sources.is_empty() {
                    println!();
                    println!("Sources:");
                    for source in &result.sources {
                        let filename = docrag::models::filename_of(&source.metadata).unwrap_or("Unknown");
                        println!("  [{}] {} (score {:.3})", source.id, filename, source.score);
                    }
                }
            }
        }
        Commands::Files => {
            let uploads = UploadStore::new(config.uploads.dir.clone());
            let files = uploads.list()?;
            if files.is_empty() {
                println!("No files uploaded.");
            }
            for file in files {
                println!("{}\t{}", file.name, file.path);
            }
        }
    }

    Ok(())
}
