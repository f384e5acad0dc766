use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::Result;
use crate::config::{Config, get_config_dir};
use crate::embeddings::provider_from_config;
use crate::engine::{FetchMode, RetrievalEngine};
use crate::store::ChunkStore;

async fn build_engine() -> Result<(Config, RetrievalEngine)> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;

    let store = ChunkStore::new(config.database_path()).await?;
    let provider = provider_from_config(&config.provider)?;

    Ok((config, RetrievalEngine::new(store, provider)))
}

/// Ingest a text file as a document.
pub async fn ingest(
    path: &Path,
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    skip_existing: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(path)?;

    let file_stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let document_id = id.unwrap_or_else(|| file_stem.clone());
    let title = title.unwrap_or(file_stem);

    let (config, mut engine) = build_engine().await?;

    info!("Ingesting {} as document {}", path.display(), document_id);

    let report = engine
        .ingest(
            &document_id,
            &title,
            url.as_deref(),
            &content,
            &config.chunking,
            skip_existing,
        )
        .await?;

    if report.skipped {
        println!(
            "Document {} already ingested, skipped.",
            style(&report.document_id).bold()
        );
        return Ok(());
    }

    println!(
        "Ingested {}: {} chunks, {} embedded",
        style(&report.document_id).bold(),
        report.chunks_created,
        report.chunks_embedded
    );
    if report.embed_failures > 0 {
        println!(
            "{} {} chunks failed to embed; run `ragstore embed-missing` to backfill",
            style("warning:").yellow().bold(),
            report.embed_failures
        );
    }

    Ok(())
}

/// Run a query and print ranked results.
pub async fn search(
    query: &str,
    limit: usize,
    candidates: usize,
    no_rerank: bool,
    json: bool,
) -> Result<()> {
    let (_config, mut engine) = build_engine().await?;

    let hits = engine.search(query, limit, candidates, !no_rerank).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits).map_err(anyhow::Error::from)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{} {} {}",
            style(format!("{}.", rank + 1)).bold(),
            style(&hit.id).cyan(),
            style(format!("(score {:.3})", hit.score)).dim()
        );
        println!("   {}", hit.snippet);
    }

    Ok(())
}

/// Print a chunk, its neighborhood, or its whole parent document.
pub async fn fetch(id: &str, mode: FetchMode, context_size: usize) -> Result<()> {
    let (_config, engine) = build_engine().await?;

    let text = engine.fetch(id, mode, context_size).await?;
    println!("{}", text);

    Ok(())
}

/// Delete a document and all its chunks.
pub async fn delete(id: &str) -> Result<()> {
    let (_config, mut engine) = build_engine().await?;

    if engine.delete_document(id).await? {
        println!("Deleted document {}.", style(id).bold());
    } else {
        println!("No document with id {}.", style(id).bold());
    }

    Ok(())
}

/// Embed chunks that are missing vectors.
pub async fn embed_missing(batch_size: usize) -> Result<()> {
    let (_config, mut engine) = build_engine().await?;

    let embedded = engine.embed_missing(batch_size).await?;
    println!("Embedded {} chunks.", embedded);

    Ok(())
}

/// Re-embed the entire corpus; required after switching embedding models or
/// dimensions.
pub async fn migrate(confirm: bool, batch_size: usize) -> Result<()> {
    let (_config, mut engine) = build_engine().await?;

    let total = engine.store().chunk_count().await?;
    if total == 0 {
        println!("Nothing to migrate.");
        return Ok(());
    }

    if !confirm {
        println!(
            "This will re-embed all {} chunks, which may take a while.",
            total
        );
        println!("Re-run with {} to proceed.", style("--confirm").bold());
        return Ok(());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_handler.store(true, Ordering::Relaxed);
        }
    });

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} chunks {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let report = engine
        .reembed_all(
            batch_size,
            |done, _total| bar.set_position(done as u64),
            &cancel,
        )
        .await?;

    bar.finish_and_clear();

    if report.cancelled {
        println!(
            "{} migration cancelled: {} re-embedded, {} failed, {} of {} processed",
            style("interrupted:").yellow().bold(),
            report.success,
            report.failed,
            report.success + report.failed,
            report.total
        );
    } else {
        println!(
            "Migration complete: {} re-embedded, {} failed, {} total",
            report.success, report.failed, report.total
        );
    }

    Ok(())
}

/// Report provider and corpus health.
pub async fn status() -> Result<()> {
    let (config, engine) = build_engine().await?;

    let report = engine.status().await?;

    println!("Provider: {}", style(report.provider_name).bold());
    println!(
        "Available: {}",
        if report.provider_available {
            style("yes").green()
        } else {
            style("no").red()
        }
    );
    println!("Embedding dimension: {}", report.embedding_dimension);
    println!("Documents: {}", report.documents);
    println!(
        "Chunks: {} ({} embedded, {} pending)",
        report.chunks,
        report.embedded_chunks,
        report.chunks - report.embedded_chunks
    );
    println!("Database: {}", config.database_path().display());

    Ok(())
}
