
use tracing::{debug, warn};

use crate::embeddings::EmbeddingProvider;
use crate::search::cosine_similarity;

/// A shortlist candidate flowing through the rerank stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankCandidate {
    pub id: String,
    pub text: String,
    /// Stored vector, when hydration found one
    pub vector: Option<Vec<f32>>,
    /// Score assigned by the first-pass similarity search
    pub score: f32,
}

/// Re-score a shortlist against the already-computed query vector using each
/// candidate's stored vector. No embedding calls: O(shortlist) vector ops.
///
/// Candidates without a stored vector keep their first-pass score. An empty
/// query vector disables reordering entirely: the input order is returned
/// truncated to `top_k`.
#[inline]
pub fn rerank_with_vectors(
    query_vector: &[f32],
    mut candidates: Vec<RerankCandidate>,
    top_k: usize,
) -> Vec<RerankCandidate> {
    if query_vector.is_empty() {
        candidates.truncate(top_k);
        return candidates;
    }

    for candidate in &mut candidates {
        if let Some(vector) = &candidate.vector {
            candidate.score = cosine_similarity(query_vector, vector);
        }
    }

    sort_and_truncate(candidates, top_k)
}

/// Legacy rerank path for shortlists without stored vectors: one provider
/// call per candidate plus one for the query. Strictly more expensive than
/// [`rerank_with_vectors`]; callers should prefer that path whenever stored
/// vectors are present.
///
/// If the provider is unavailable or the query embedding fails, the input
/// order is returned truncated to `top_k` rather than failing the search.
#[inline]
pub fn rerank_recompute(
    provider: &dyn EmbeddingProvider,
    query: &str,
    mut candidates: Vec<RerankCandidate>,
    top_k: usize,
) -> Vec<RerankCandidate> {
    if !provider.is_available() {
        warn!("Embedding provider unavailable, skipping rerank");
        candidates.truncate(top_k);
        return candidates;
    }

    let query_vector = match provider.embed(query) {
        Ok(vector) => vector,
        Err(e) => {
            warn!("Failed to embed query for rerank: {:#}", e);
            candidates.truncate(top_k);
            return candidates;
        }
    };

    let delay = provider.policy().request_delay;

    for candidate in &mut candidates {
        if let Some(pause) = delay {
            std::thread::sleep(pause);
        }
        match provider.embed(&candidate.text) {
            Ok(vector) => candidate.score = cosine_similarity(&query_vector, &vector),
            Err(e) => {
                // Keep the first-pass score rather than dropping the hit.
                warn!("Failed to re-embed candidate {}: {:#}", candidate.id, e);
            }
        }
    }

    debug!("Recompute rerank scored {} candidates", candidates.len());
    sort_and_truncate(candidates, top_k)
}

fn sort_and_truncate(
    mut candidates: Vec<RerankCandidate>,
    top_k: usize,
) -> Vec<RerankCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(top_k);
    candidates
}
