#[cfg(test)]
mod tests;

pub mod models;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

use crate::{RagError, Result};
use models::{Chunk, Document, vector_from_blob, vector_to_blob};

/// Durable record of documents, their chunks, each chunk's optional vector,
/// and an FTS5 keyword index for fallback search.
///
/// Missing ids are reported as `None`/empty results; only persistence-engine
/// failures surface as [`RagError::Storage`].
#[derive(Debug, Clone)]
pub struct ChunkStore {
    pool: SqlitePool,
}

/// A keyword-search hit: chunk id plus a short excerpt around the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordHit {
    pub id: String,
    pub snippet: String,
}

fn storage_err(operation: &str, error: impl std::fmt::Display) -> RagError {
    RagError::Storage(format!("Failed to {}: {}", operation, error))
}

impl ChunkStore {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(|e| storage_err("create database connection pool", e))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/store/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| storage_err("run schema migration", e))?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Insert or replace a document row (upsert keyed on id).
    pub async fn insert_document(
        &self,
        id: &str,
        title: &str,
        url: Option<&str>,
        content: &str,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO documents (id, title, url, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                url = excluded.url,
                content = excluded.content
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(url)
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("insert document", e))?;

        Ok(())
    }

    pub async fn fetch_document(&self, id: &str) -> Result<Option<Document>> {
        sqlx::query_as::<_, Document>(
            "SELECT id, title, url, content, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("fetch document", e))
    }

    pub async fn document_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_err("check document existence", e))?;

        Ok(count > 0)
    }

    /// Delete a document; its chunks (and their keyword-index rows) cascade.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("delete document", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or replace a chunk row. The FTS triggers update the keyword
    /// index entry for the chunk's text.
    pub async fn insert_chunk(
        &self,
        id: &str,
        document_id: &str,
        sequence_index: usize,
        text: &str,
        vector: Option<&[f32]>,
    ) -> Result<()> {
        let blob = vector.map(vector_to_blob);
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, sequence_index, text, vector)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                document_id = excluded.document_id,
                sequence_index = excluded.sequence_index,
                text = excluded.text,
                vector = excluded.vector
            "#,
        )
        .bind(id)
        .bind(document_id)
        .bind(sequence_index as i64)
        .bind(text)
        .bind(blob)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("insert chunk", e))?;

        Ok(())
    }

    pub async fn fetch_chunk(&self, id: &str) -> Result<Option<Chunk>> {
        sqlx::query_as::<_, Chunk>(
            "SELECT id, document_id, sequence_index, text, vector FROM chunks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("fetch chunk", e))
    }

    /// Fetch the chunk's neighborhood: texts of the same document's chunks
    /// whose sequence index lies within `[index - window, index + window]`,
    /// ordered by index. Empty if the chunk is unknown.
    pub async fn fetch_chunks_with_context(
        &self,
        chunk_id: &str,
        window: usize,
    ) -> Result<Vec<String>> {
        let Some(chunk) = self.fetch_chunk(chunk_id).await? else {
            return Ok(Vec::new());
        };

        let low = chunk.sequence_index - window as i64;
        let high = chunk.sequence_index + window as i64;

        sqlx::query_scalar::<_, String>(
            r#"
            SELECT text FROM chunks
            WHERE document_id = ? AND sequence_index BETWEEN ? AND ?
            ORDER BY sequence_index
            "#,
        )
        .bind(&chunk.document_id)
        .bind(low)
        .bind(high)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("fetch chunk context", e))
    }

    /// Every chunk with a non-null vector. This is the full candidate set for
    /// similarity search: O(corpus size), so callers cache the result.
    pub async fn fetch_all_vectors(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let rows = sqlx::query_as::<_, (String, Vec<u8>)>(
            "SELECT id, vector FROM chunks WHERE vector IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("fetch all vectors", e))?;

        rows.into_iter()
            .map(|(id, blob)| Ok((id, vector_from_blob(&blob)?)))
            .collect()
    }

    /// Vector-less chunks for incremental backfill, oldest ids first.
    pub async fn fetch_chunks_without_vectors(
        &self,
        limit: usize,
    ) -> Result<Vec<(String, String)>> {
        sqlx::query_as::<_, (String, String)>(
            "SELECT id, text FROM chunks WHERE vector IS NULL ORDER BY id LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("fetch chunks without vectors", e))
    }

    /// Every chunk regardless of vector state, for full migration.
    pub async fn fetch_all_chunks_for_reembedding(&self) -> Result<Vec<(String, String)>> {
        sqlx::query_as::<_, (String, String)>("SELECT id, text FROM chunks ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("fetch chunks for re-embedding", e))
    }

    /// Overwrite only the vector column of an existing chunk.
    pub async fn update_chunk_vector(&self, id: &str, vector: &[f32]) -> Result<()> {
        sqlx::query("UPDATE chunks SET vector = ? WHERE id = ?")
            .bind(vector_to_blob(vector))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("update chunk vector", e))?;

        Ok(())
    }

    /// Full-text fallback search over chunk text, ranked by bm25, each hit
    /// carrying a short excerpt around the match.
    pub async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<KeywordHit>> {
        let match_expr = fts_match_expression(query);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT c.id, snippet(chunks_fts, 0, '', '', '…', 12)
            FROM chunks_fts
            JOIN chunks c ON c.rowid = chunks_fts.rowid
            WHERE chunks_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(match_expr)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("run keyword search", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, snippet)| KeywordHit { id, snippet })
            .collect())
    }

    pub async fn document_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_err("count documents", e))
    }

    pub async fn chunk_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_err("count chunks", e))
    }

    pub async fn embedded_chunk_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE vector IS NOT NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_err("count embedded chunks", e))
    }
}

/// Quote each term so user input cannot inject FTS5 query syntax. Terms are
/// implicitly AND-ed by FTS5.
fn fts_match_expression(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}
