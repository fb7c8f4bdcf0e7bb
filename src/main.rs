//! # Synapse CLI (`synapse`)
//!
//! ## Usage
//!
//! ```bash
//! synapse --config ./config/synapse.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `synapse init` | Create the SQLite database and schema |
//! | `synapse index <path>` | Chunk, embed and store a text file |
//! | `synapse chunk <path>` | Preview chunks without writing |
//! | `synapse query "<text>"` | Retrieve and rerank chunks |
//! | `synapse documents` | List indexed documents |
//! | `synapse remove <id>` | Delete a document's chunks |
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default
//! `synapse=info`). Command output goes to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use synapse::{config, documents, ingest, migrate, search};

/// Synapse: semantic chunking, vector retrieval and cross-encoder
/// reranking over your documents.
#[derive(Parser)]
#[command(
    name = "synapse",
    about = "Synapse: semantic chunking, vector retrieval and cross-encoder reranking",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/synapse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Index a UTF-8 text file, replacing any earlier version of the document.
    Index {
        /// Path to the text file.
        path: PathBuf,

        /// Document id. Defaults to a fresh UUID.
        #[arg(long)]
        id: Option<String>,

        /// Display name. Defaults to the file name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the chunks a file would produce, without indexing it.
    ///
    /// Works without a config file.
    Chunk {
        path: PathBuf,

        /// Override `chunking.max_chars`.
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Retrieve the most relevant chunks for a question.
    Query {
        /// The query text.
        query: String,

        /// Number of results. Defaults to `retrieval.top_k`.
        #[arg(long)]
        top_k: Option<i64>,

        /// Restrict retrieval to one document id.
        #[arg(long)]
        document: Option<String>,

        /// Emit results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List indexed documents with chunk counts.
    Documents,

    /// Remove every chunk of a document.
    Remove {
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("synapse=info,synapse_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Chunk { path, max_chars } = &cli.command {
        let cfg = if cli.config.exists() {
            config::load_config(&cli.config)?
        } else {
            config::Config::minimal()
        };
        ingest::run_chunk(&cfg, path, *max_chars).await?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index { path, id, name } => {
            ingest::run_index(&cfg, &path, id, name).await?;
        }
        Commands::Chunk { .. } => {
            // Handled above (before config loading)
        }
        Commands::Query {
            query,
            top_k,
            document,
            json,
        } => {
            search::run_query(&cfg, &query, top_k, document, json).await?;
        }
        Commands::Documents => {
            documents::run_documents(&cfg).await?;
        }
        Commands::Remove { document_id } => {
            documents::run_remove(&cfg, &document_id).await?;
        }
    }

    Ok(())
}
