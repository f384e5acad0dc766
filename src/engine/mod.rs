
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::chunking::{ChunkingConfig, split_into_windows};
use crate::embeddings::EmbeddingProvider;
use crate::rerank::{RerankCandidate, rerank_with_vectors};
use crate::store::ChunkStore;
use crate::store::models::chunk_id;
use crate::{RagError, Result, search};

/// Display length for result snippets, in characters.
const SNIPPET_DISPLAY_LEN: usize = 200;

/// Score attached to keyword-fallback hits, which have no meaningful
/// similarity value. Mid-scale so they neither look perfect nor irrelevant.
const NEUTRAL_KEYWORD_SCORE: f32 = 0.5;

/// Orchestrates embedding generation, storage, similarity search, reranking,
/// and re-embedding migration.
///
/// All operations go through `&mut self`, so one owner serializes every read
/// and mutation of the vector cache; there is no finer-grained locking to get
/// wrong.
pub struct RetrievalEngine {
    store: ChunkStore,
    provider: Box<dyn EmbeddingProvider>,
    /// Lazily-loaded copy of every stored (chunk id, vector) pair. Cleared
    /// after any write that adds, updates, or removes a vector; never
    /// patched incrementally.
    vector_cache: Option<Vec<(String, Vec<f32>)>>,
    cache_invalidations: u64,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SearchHit {
    pub id: String,
    pub snippet: String,
    pub score: f32,
}

/// What `fetch` should return for a chunk id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// The raw chunk text
    Chunk,
    /// The chunk's neighborhood, joined with paragraph breaks
    Context,
    /// The parent document's entire content
    Full,
}

/// Outcome of a document ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub document_id: String,
    pub skipped: bool,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub embed_failures: usize,
}

/// Outcome of a full re-embedding migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    pub cancelled: bool,
}

/// Snapshot of engine health for the status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub provider_name: &'static str,
    pub provider_available: bool,
    pub embedding_dimension: usize,
    pub documents: i64,
    pub chunks: i64,
    pub embedded_chunks: i64,
}

impl RetrievalEngine {
    #[inline]
    pub fn new(store: ChunkStore, provider: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider,
            vector_cache: None,
            cache_invalidations: 0,
        }
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Answer a query with the most relevant chunks.
    ///
    /// Vector path: embed the query, rank the cached vector set, hydrate the
    /// shortlist, optionally rerank against stored vectors. If the provider
    /// fails or no vectors exist, falls back to keyword search with a neutral
    /// score; fallback is a success path, never an error.
    pub async fn search(
        &mut self,
        query: &str,
        limit: usize,
        candidate_count: usize,
        use_reranker: bool,
    ) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Reranking needs more material than the final limit.
        let candidate_count = candidate_count.max(limit);

        let query_vector = match self.provider.embed(query) {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Query embedding failed, falling back to keyword search: {:#}", e);
                return self.keyword_fallback(query, limit).await;
            }
        };

        self.ensure_cache_loaded().await?;
        let cache = self.vector_cache.as_deref().unwrap_or_default();

        if cache.is_empty() {
            debug!("No stored vectors, falling back to keyword search");
            return self.keyword_fallback(query, limit).await;
        }

        let shortlist = search::search(&query_vector, cache, candidate_count);

        // Hydrate candidate text and stored vectors; chunks deleted since the
        // cache was loaded are silently dropped.
        let mut candidates = Vec::with_capacity(shortlist.len());
        for scored in shortlist {
            let Some(chunk) = self.store.fetch_chunk(&scored.id).await? else {
                debug!("Dropping stale candidate {}", scored.id);
                continue;
            };
            candidates.push(RerankCandidate {
                id: scored.id,
                vector: chunk.decoded_vector()?,
                text: chunk.text,
                score: scored.score,
            });
        }

        let ranked = if use_reranker {
            rerank_with_vectors(&query_vector, candidates, limit)
        } else {
            candidates.truncate(limit);
            candidates
        };

        Ok(ranked
            .into_iter()
            .map(|candidate| SearchHit {
                id: candidate.id,
                snippet: truncate_snippet(&candidate.text),
                score: candidate.score,
            })
            .collect())
    }

    async fn keyword_fallback(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let hits = self.store.keyword_search(query, limit).await?;
        info!("Keyword fallback returned {} hits", hits.len());

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.id,
                snippet: truncate_snippet(&hit.snippet),
                score: NEUTRAL_KEYWORD_SCORE,
            })
            .collect())
    }

    /// Store a document and its overlapping word-window chunks, embedding
    /// each window. A failed embed stores the chunk without a vector and
    /// continues; ingest never aborts because one chunk failed.
    pub async fn ingest(
        &mut self,
        document_id: &str,
        title: &str,
        url: Option<&str>,
        content: &str,
        chunking: &ChunkingConfig,
        skip_if_existing: bool,
    ) -> Result<IngestReport> {
        if skip_if_existing && self.store.document_exists(document_id).await? {
            info!("Document {} already ingested, skipping", document_id);
            return Ok(IngestReport {
                document_id: document_id.to_string(),
                skipped: true,
                chunks_created: 0,
                chunks_embedded: 0,
                embed_failures: 0,
            });
        }

        let windows = split_into_windows(content, chunking)
            .map_err(|e| RagError::Config(e.to_string()))?;

        self.store
            .insert_document(document_id, title, url, content)
            .await?;

        let delay = self.provider.policy().request_delay;
        let mut embedded = 0;
        let mut failures = 0;

        for (index, window) in windows.iter().enumerate() {
            if index > 0 {
                if let Some(pause) = delay {
                    tokio::time::sleep(pause).await;
                }
            }

            let vector = match self.provider.embed(window) {
                Ok(vector) => {
                    embedded += 1;
                    Some(vector)
                }
                Err(e) => {
                    warn!(
                        "Failed to embed chunk {} of document {}: {:#}",
                        index, document_id, e
                    );
                    failures += 1;
                    None
                }
            };

            self.store
                .insert_chunk(
                    &chunk_id(document_id, index),
                    document_id,
                    index,
                    window,
                    vector.as_deref(),
                )
                .await?;
        }

        self.invalidate_cache();

        info!(
            "Ingested document {}: {} chunks, {} embedded, {} failures",
            document_id,
            windows.len(),
            embedded,
            failures
        );

        Ok(IngestReport {
            document_id: document_id.to_string(),
            skipped: false,
            chunks_created: windows.len(),
            chunks_embedded: embedded,
            embed_failures: failures,
        })
    }

    /// Delete a document and all its chunks. Returns false if the id was
    /// unknown.
    pub async fn delete_document(&mut self, document_id: &str) -> Result<bool> {
        let deleted = self.store.delete_document(document_id).await?;
        if deleted {
            self.invalidate_cache();
        }
        Ok(deleted)
    }

    /// Embed up to `batch_size` chunks that have no vector yet. Failures are
    /// counted and logged, never abort the batch. Returns the success count.
    pub async fn embed_missing(&mut self, batch_size: usize) -> Result<usize> {
        let pending = self.store.fetch_chunks_without_vectors(batch_size).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let delay = self.provider.policy().request_delay;
        let mut success = 0;
        let mut failed = 0;

        for (index, (id, text)) in pending.iter().enumerate() {
            if index > 0 {
                if let Some(pause) = delay {
                    tokio::time::sleep(pause).await;
                }
            }

            match self.provider.embed(text) {
                Ok(vector) => {
                    self.store.update_chunk_vector(id, &vector).await?;
                    success += 1;
                }
                Err(e) => {
                    warn!("Failed to embed chunk {}: {:#}", id, e);
                    failed += 1;
                }
            }
        }

        self.invalidate_cache();

        info!(
            "Backfill embedded {} chunks ({} failures)",
            success, failed
        );
        Ok(success)
    }

    /// Re-embed every chunk regardless of current vector state; used when the
    /// embedding provider or its dimension changes.
    ///
    /// `progress(processed, total)` fires at each batch boundary and at
    /// completion. Cancellation is checked once per chunk: already-written
    /// vectors stay intact and the rest are left untouched. The cache is
    /// invalidated exactly once, at the end.
    pub async fn reembed_all(
        &mut self,
        batch_size: usize,
        mut progress: impl FnMut(usize, usize),
        cancel: &AtomicBool,
    ) -> Result<MigrationReport> {
        let chunks = self.store.fetch_all_chunks_for_reembedding().await?;
        let total = chunks.len();
        info!("Starting re-embedding migration over {} chunks", total);

        let delay = self.provider.policy().request_delay;
        let batch_size = batch_size.max(1);
        let mut success = 0;
        let mut failed = 0;
        let mut processed = 0;
        let mut cancelled = false;

        'batches: for batch in chunks.chunks(batch_size) {
            for (id, text) in batch {
                if cancel.load(Ordering::Relaxed) {
                    warn!(
                        "Migration cancelled after {} of {} chunks",
                        processed, total
                    );
                    cancelled = true;
                    break 'batches;
                }

                if processed > 0 {
                    if let Some(pause) = delay {
                        tokio::time::sleep(pause).await;
                    }
                }

                match self.provider.embed(text) {
                    Ok(vector) => {
                        self.store.update_chunk_vector(id, &vector).await?;
                        success += 1;
                    }
                    Err(e) => {
                        warn!("Failed to re-embed chunk {}: {:#}", id, e);
                        failed += 1;
                    }
                }
                processed += 1;
            }

            progress(processed, total);
        }

        progress(processed, total);
        self.invalidate_cache();

        info!(
            "Migration finished: {} succeeded, {} failed, {} total",
            success, failed, total
        );

        Ok(MigrationReport {
            success,
            failed,
            total,
            cancelled,
        })
    }

    /// Retrieve chunk text, its neighborhood, or the whole parent document.
    pub async fn fetch(
        &self,
        id: &str,
        mode: FetchMode,
        context_size: usize,
    ) -> Result<String> {
        match mode {
            FetchMode::Chunk => {
                let chunk = self
                    .store
                    .fetch_chunk(id)
                    .await?
                    .ok_or_else(|| RagError::NotFound(id.to_string()))?;
                Ok(chunk.text)
            }
            FetchMode::Context => {
                let texts = self.store.fetch_chunks_with_context(id, context_size).await?;
                if texts.is_empty() {
                    return Err(RagError::NotFound(id.to_string()));
                }
                Ok(texts.join("\n\n"))
            }
            FetchMode::Full => {
                let chunk = self
                    .store
                    .fetch_chunk(id)
                    .await?
                    .ok_or_else(|| RagError::NotFound(id.to_string()))?;
                let document = self
                    .store
                    .fetch_document(&chunk.document_id)
                    .await?
                    .ok_or_else(|| RagError::NotFound(chunk.document_id.clone()))?;
                Ok(document.content)
            }
        }
    }

    /// Provider and corpus health, for the status command.
    pub async fn status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            provider_name: self.provider.name(),
            provider_available: self.provider.is_available(),
            embedding_dimension: self.provider.dimension(),
            documents: self.store.document_count().await?,
            chunks: self.store.chunk_count().await?,
            embedded_chunks: self.store.embedded_chunk_count().await?,
        })
    }

    async fn ensure_cache_loaded(&mut self) -> Result<()> {
        if self.vector_cache.is_none() {
            let vectors = self.store.fetch_all_vectors().await?;
            debug!("Loaded vector cache with {} entries", vectors.len());
            self.vector_cache = Some(vectors);
        }
        Ok(())
    }

    /// Clear-and-reload coherence: the cache is dropped wholesale after any
    /// vector write, never patched in place.
    fn invalidate_cache(&mut self) {
        self.vector_cache = None;
        self.cache_invalidations += 1;
        debug!("Vector cache invalidated ({} total)", self.cache_invalidations);
    }

    #[cfg(test)]
    pub(crate) fn cache_invalidation_count(&self) -> u64 {
        self.cache_invalidations
    }

    #[cfg(test)]
    pub(crate) fn cache_is_loaded(&self) -> bool {
        self.vector_cache.is_some()
    }
}

/// Truncate to the display length on a character boundary, appending an
/// ellipsis when content was cut.
fn truncate_snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_DISPLAY_LEN {
        return text.to_string();
    }
    let truncated: String = text.chars().take(SNIPPET_DISPLAY_LEN).collect();
    format!("{}…", truncated.trim_end())
}
