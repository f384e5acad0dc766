#[cfg(test)]
mod tests;

use tracing::debug;

/// A scored candidate returned from similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: String,
    pub score: f32,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector is zero-length or has zero magnitude, so a
/// degenerate candidate sorts to the bottom instead of producing NaN.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
#[inline]
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}

/// Rank candidates by cosine similarity against the query vector.
///
/// Pure function, no I/O. Candidates whose dimension does not match the query
/// are skipped individually rather than failing the whole search. Ties keep
/// the insertion order of the candidate sequence (stable sort). Returns at
/// most `top_k` entries.
#[inline]
pub fn search(
    query_vector: &[f32],
    candidates: &[(String, Vec<f32>)],
    top_k: usize,
) -> Vec<ScoredCandidate> {
    if query_vector.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut skipped = 0usize;
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .filter_map(|(id, vector)| {
            if vector.len() != query_vector.len() {
                skipped += 1;
                return None;
            }
            Some(ScoredCandidate {
                id: id.clone(),
                score: cosine_similarity(query_vector, vector),
            })
        })
        .collect();

    if skipped > 0 {
        debug!(
            "Skipped {} candidates with mismatched vector dimension (query dim {})",
            skipped,
            query_vector.len()
        );
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}
