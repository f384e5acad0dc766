use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use ragstore::Result;
use ragstore::commands::{delete, embed_missing, fetch, ingest, migrate, search, status};
use ragstore::engine::FetchMode;

#[derive(Parser)]
#[command(name = "ragstore")]
#[command(about = "Retrieval-augmented search over a corpus of text chunks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a text file as a document
    Ingest {
        /// Path to the text file to ingest
        path: PathBuf,
        /// Document id (defaults to the file stem)
        #[arg(long)]
        id: Option<String>,
        /// Document title (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,
        /// Source URL to record with the document
        #[arg(long)]
        url: Option<String>,
        /// Skip ingestion if the document id already exists
        #[arg(long)]
        skip_existing: bool,
    },
    /// Search the corpus for relevant chunks
    Search {
        /// Natural-language query
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// First-pass candidate count handed to the reranker
        #[arg(long, default_value_t = 20)]
        candidates: usize,
        /// Skip the reranking pass
        #[arg(long)]
        no_rerank: bool,
        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a chunk, its neighborhood, or its whole document
    Fetch {
        /// Chunk id
        id: String,
        /// What to return for the chunk
        #[arg(long, value_enum, default_value_t = FetchModeArg::Chunk)]
        mode: FetchModeArg,
        /// Neighborhood radius in chunks, for --mode context
        #[arg(long, default_value_t = 2)]
        context: usize,
    },
    /// Delete a document and all its chunks
    Delete {
        /// Document id
        id: String,
    },
    /// Embed chunks that are missing vectors
    EmbedMissing {
        /// Maximum chunks to embed in this run
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
    },
    /// Re-embed the entire corpus (after switching embedding models)
    Migrate {
        /// Actually run the migration
        #[arg(long)]
        confirm: bool,
        /// Chunks per progress batch
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
    },
    /// Show provider and corpus status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FetchModeArg {
    Chunk,
    Context,
    Full,
}

impl From<FetchModeArg> for FetchMode {
    fn from(mode: FetchModeArg) -> Self {
        match mode {
            FetchModeArg::Chunk => FetchMode::Chunk,
            FetchModeArg::Context => FetchMode::Context,
            FetchModeArg::Full => FetchMode::Full,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            path,
            id,
            title,
            url,
            skip_existing,
        } => {
            ingest(&path, id, title, url, skip_existing).await?;
        }
        Commands::Search {
            query,
            limit,
            candidates,
            no_rerank,
            json,
        } => {
            search(&query, limit, candidates, no_rerank, json).await?;
        }
        Commands::Fetch { id, mode, context } => {
            fetch(&id, mode.into(), context).await?;
        }
        Commands::Delete { id } => {
            delete(&id).await?;
        }
        Commands::EmbedMissing { batch_size } => {
            embed_missing(batch_size).await?;
        }
        Commands::Migrate {
            confirm,
            batch_size,
        } => {
            migrate(confirm, batch_size).await?;
        }
        Commands::Status => {
            status().await?;
        }
    }

    Ok(())
}
