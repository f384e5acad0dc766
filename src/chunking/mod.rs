
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for splitting document content into overlapping word windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in words
    pub chunk_size: usize,
    /// Number of words shared between adjacent windows
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkingConfig {
    /// The overlap must be strictly smaller than the window size, otherwise
    /// the window start never advances.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if self.overlap >= self.chunk_size {
            bail!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap,
                self.chunk_size
            );
        }
        Ok(())
    }
}

/// Split content into overlapping word windows.
///
/// Window `i` covers words `[i * stride, i * stride + chunk_size)` where
/// `stride = chunk_size - overlap`; the split stops once a window start
/// reaches the end of the word sequence. Whitespace-only content yields no
/// windows.
#[inline]
pub fn split_into_windows(content: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    config.validate()?;

    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let stride = config.chunk_size - config.overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        windows.push(words[start..end].join(" "));
        start += stride;
    }

    debug!(
        "Split {} words into {} windows (chunk_size {}, overlap {})",
        words.len(),
        windows.len(),
        config.chunk_size,
        config.overlap
    );

    Ok(windows)
}
