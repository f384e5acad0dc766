pub mod local;
pub mod remote;

use anyhow::Result;
use std::time::Duration;

use crate::config::{ProviderConfig, ProviderKind};
use local::LocalEmbedder;
use remote::RemoteEmbedder;

/// Contract for anything that can turn text into a fixed-dimension vector.
///
/// The engine depends only on this trait; which backend is active is decided
/// once at construction time. Backend-specific tuning lives in
/// [`ProviderPolicy`] rather than conditionals scattered through callers.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. Failures here are provider failures: callers
    /// fall back or count them, they do not abort batches.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output dimension, fixed for the lifetime of the provider instance.
    fn dimension(&self) -> usize;

    /// Non-throwing liveness probe.
    fn is_available(&self) -> bool;

    /// Human-readable backend name for status output.
    fn name(&self) -> &'static str;

    /// Per-variant call pacing.
    fn policy(&self) -> ProviderPolicy {
        ProviderPolicy::default()
    }
}

/// Pacing rules that differ between provider variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderPolicy {
    /// Fixed pause between consecutive embed calls, for rate-limited remote
    /// endpoints. `None` for in-process providers.
    pub request_delay: Option<Duration>,
}

/// Build the provider selected by the configuration.
#[inline]
pub fn provider_from_config(config: &ProviderConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.kind {
        ProviderKind::Local => Ok(Box::new(LocalEmbedder::new(
            config.embedding_dimension as usize,
        ))),
        ProviderKind::Remote => Ok(Box::new(RemoteEmbedder::new(config)?)),
    }
}
