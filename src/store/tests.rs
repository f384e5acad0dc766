use super::*;
use tempfile::TempDir;

async fn create_test_store() -> (TempDir, ChunkStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let store = ChunkStore::new(&db_path)
        .await
        .expect("Failed to create test store");

    (temp_dir, store)
}

async fn seed_document(store: &ChunkStore, id: &str, chunk_texts: &[&str]) {
    store
        .insert_document(id, "Test Document", None, &chunk_texts.join(" "))
        .await
        .expect("Failed to insert document");

    for (index, text) in chunk_texts.iter().enumerate() {
        store
            .insert_chunk(
                &models::chunk_id(id, index),
                id,
                index,
                text,
                Some(&[index as f32, 1.0]),
            )
            .await
            .expect("Failed to insert chunk");
    }
}

#[tokio::test]
async fn document_upsert_and_fetch() {
    let (_temp_dir, store) = create_test_store().await;

    store
        .insert_document("doc-1", "First Title", Some("https://example.com"), "content one")
        .await
        .expect("Failed to insert document");

    let doc = store
        .fetch_document("doc-1")
        .await
        .expect("Failed to fetch document")
        .expect("Document should exist");
    assert_eq!(doc.title, "First Title");
    assert_eq!(doc.url.as_deref(), Some("https://example.com"));
    assert_eq!(doc.content, "content one");

    // Re-insert with the same id replaces the row.
    store
        .insert_document("doc-1", "Second Title", None, "content two")
        .await
        .expect("Failed to upsert document");

    let doc = store
        .fetch_document("doc-1")
        .await
        .expect("Failed to fetch document")
        .expect("Document should exist");
    assert_eq!(doc.title, "Second Title");
    assert_eq!(doc.url, None);
    assert_eq!(doc.content, "content two");
}

#[tokio::test]
async fn missing_document_is_none_not_error() {
    let (_temp_dir, store) = create_test_store().await;

    let result = store
        .fetch_document("no-such-id")
        .await
        .expect("Query should succeed");
    assert!(result.is_none());
    assert!(
        !store
            .document_exists("no-such-id")
            .await
            .expect("Query should succeed")
    );
}

#[tokio::test]
async fn chunk_insert_fetch_and_vector_update() {
    let (_temp_dir, store) = create_test_store().await;

    store
        .insert_document("doc-1", "Doc", None, "some text here")
        .await
        .expect("Failed to insert document");

    store
        .insert_chunk("doc-1#0", "doc-1", 0, "some text here", None)
        .await
        .expect("Failed to insert chunk");

    let chunk = store
        .fetch_chunk("doc-1#0")
        .await
        .expect("Failed to fetch chunk")
        .expect("Chunk should exist");
    assert_eq!(chunk.document_id, "doc-1");
    assert_eq!(chunk.sequence_index, 0);
    assert!(chunk.vector.is_none());

    store
        .update_chunk_vector("doc-1#0", &[0.25, 0.75])
        .await
        .expect("Failed to update vector");

    let chunk = store
        .fetch_chunk("doc-1#0")
        .await
        .expect("Failed to fetch chunk")
        .expect("Chunk should exist");
    assert_eq!(
        chunk.decoded_vector().expect("Failed to decode vector"),
        Some(vec![0.25, 0.75])
    );
}

#[tokio::test]
async fn vectorless_chunks_are_excluded_from_vector_set() {
    let (_temp_dir, store) = create_test_store().await;

    store
        .insert_document("doc-1", "Doc", None, "text")
        .await
        .expect("Failed to insert document");
    store
        .insert_chunk("doc-1#0", "doc-1", 0, "embedded chunk", Some(&[1.0, 0.0]))
        .await
        .expect("Failed to insert chunk");
    store
        .insert_chunk("doc-1#1", "doc-1", 1, "bare chunk", None)
        .await
        .expect("Failed to insert chunk");

    let vectors = store
        .fetch_all_vectors()
        .await
        .expect("Failed to fetch vectors");
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0].0, "doc-1#0");
    assert_eq!(vectors[0].1, vec![1.0, 0.0]);

    let missing = store
        .fetch_chunks_without_vectors(10)
        .await
        .expect("Failed to fetch vector-less chunks");
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].0, "doc-1#1");

    let all = store
        .fetch_all_chunks_for_reembedding()
        .await
        .expect("Failed to fetch all chunks");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn context_window_is_ordered_and_bounded() {
    let (_temp_dir, store) = create_test_store().await;
    seed_document(&store, "doc-1", &["zero", "one", "two", "three", "four"]).await;

    let context = store
        .fetch_chunks_with_context("doc-1#2", 1)
        .await
        .expect("Failed to fetch context");
    assert_eq!(context, vec!["one", "two", "three"]);

    // Window larger than the document clamps to what exists.
    let context = store
        .fetch_chunks_with_context("doc-1#0", 10)
        .await
        .expect("Failed to fetch context");
    assert_eq!(context, vec!["zero", "one", "two", "three", "four"]);

    // Unknown chunk yields empty, not an error.
    let context = store
        .fetch_chunks_with_context("doc-9#0", 2)
        .await
        .expect("Query should succeed");
    assert!(context.is_empty());
}

#[tokio::test]
async fn context_stays_within_document() {
    let (_temp_dir, store) = create_test_store().await;
    seed_document(&store, "doc-1", &["a0", "a1"]).await;
    seed_document(&store, "doc-2", &["b0", "b1"]).await;

    let context = store
        .fetch_chunks_with_context("doc-1#1", 5)
        .await
        .expect("Failed to fetch context");
    assert_eq!(context, vec!["a0", "a1"]);
}

#[tokio::test]
async fn keyword_search_ranks_and_snippets() {
    let (_temp_dir, store) = create_test_store().await;
    seed_document(
        &store,
        "doc-1",
        &[
            "the borrow checker enforces ownership rules",
            "garbage collection pauses the program",
            "ownership and borrowing avoid data races",
        ],
    )
    .await;

    let hits = store
        .keyword_search("ownership", 10)
        .await
        .expect("Failed to search");
    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert!(hit.snippet.contains("ownership"));
    }

    let none = store
        .keyword_search("nonexistentterm", 10)
        .await
        .expect("Failed to search");
    assert!(none.is_empty());
}

#[tokio::test]
async fn keyword_search_survives_fts_syntax_in_query() {
    let (_temp_dir, store) = create_test_store().await;
    seed_document(&store, "doc-1", &["plain text chunk"]).await;

    // Quotes, operators, and parens must not break the query.
    for query in ["\"text", "text AND", "(text)", "text*", ""] {
        store
            .keyword_search(query, 5)
            .await
            .expect("Sanitized query should not error");
    }
}

#[tokio::test]
async fn delete_document_cascades_to_chunks_and_index() {
    let (_temp_dir, store) = create_test_store().await;
    seed_document(&store, "doc-1", &["alpha chunk", "beta chunk"]).await;
    seed_document(&store, "doc-2", &["gamma chunk"]).await;

    let deleted = store
        .delete_document("doc-1")
        .await
        .expect("Failed to delete document");
    assert!(deleted);

    assert!(
        store
            .fetch_chunk("doc-1#0")
            .await
            .expect("Query should succeed")
            .is_none()
    );

    let vectors = store
        .fetch_all_vectors()
        .await
        .expect("Failed to fetch vectors");
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0].0, "doc-2#0");

    let hits = store
        .keyword_search("alpha", 10)
        .await
        .expect("Failed to search");
    assert!(hits.is_empty());

    let hits = store
        .keyword_search("gamma", 10)
        .await
        .expect("Failed to search");
    assert_eq!(hits.len(), 1);

    // Deleting again reports false.
    assert!(
        !store
            .delete_document("doc-1")
            .await
            .expect("Delete should succeed")
    );
}

#[tokio::test]
async fn counts_reflect_store_contents() {
    let (_temp_dir, store) = create_test_store().await;
    seed_document(&store, "doc-1", &["one", "two"]).await;
    store
        .insert_chunk("doc-1#2", "doc-1", 2, "three", None)
        .await
        .expect("Failed to insert chunk");

    assert_eq!(store.document_count().await.expect("count failed"), 1);
    assert_eq!(store.chunk_count().await.expect("count failed"), 3);
    assert_eq!(store.embedded_chunk_count().await.expect("count failed"), 2);
}

#[test]
fn match_expression_quotes_terms() {
    assert_eq!(fts_match_expression("hello world"), "\"hello\" \"world\"");
    assert_eq!(fts_match_expression("say \"hi\""), "\"say\" \"\"\"hi\"\"\"");
    assert_eq!(fts_match_expression("   "), "");
}
