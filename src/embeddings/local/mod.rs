
use anyhow::{Result, bail};
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{EmbeddingProvider, ProviderPolicy};
use crate::search::normalize;

/// In-process embedding backend.
///
/// Produces a unit-normalized hashed bag-of-words projection: each token is
/// hashed into one of `dimension` buckets with a hash-derived sign, counts
/// are accumulated, and the result is scaled to unit length. Deterministic
/// for a given input, requires no model files or network, and texts sharing
/// vocabulary land near each other, which is all the similarity pipeline
/// needs from a local fallback model.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimension: usize,
}

impl LocalEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn token_slot(&self, token: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let h = hasher.finish();

        let index = (h % self.dimension as u64) as usize;
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl EmbeddingProvider for LocalEmbedder {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            bail!("Cannot embed empty text");
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.is_empty() {
                continue;
            }
            let (index, sign) = self.token_slot(token);
            vector[index] += sign;
        }

        Ok(normalize(&vector))
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn is_available(&self) -> bool {
        true
    }

    #[inline]
    fn name(&self) -> &'static str {
        "local"
    }

    #[inline]
    fn policy(&self) -> ProviderPolicy {
        // In-process, no pacing needed.
        ProviderPolicy {
            request_delay: None,
        }
    }
}
