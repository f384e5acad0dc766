#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{EmbeddingProvider, ProviderPolicy};
use crate::config::ProviderConfig;

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Embedding backend speaking the Ollama `/api/embed` HTTP protocol.
#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    base_url: Url,
    model: String,
    dimension: usize,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
    request_delay: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl RemoteEmbedder {
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = config
            .endpoint_url()
            .context("Failed to build embedding endpoint URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        let request_delay = if config.request_delay_ms > 0 {
            Some(Duration::from_millis(config.request_delay_ms))
        } else {
            None
        };

        Ok(Self {
            base_url,
            model: config.model.clone(),
            dimension: config.embedding_dimension as usize,
            batch_size: config.batch_size,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            request_delay,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Ping the server to check it is responsive.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build ping URL")?;

        debug!("Pinging embedding server at {}", url);

        self.agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Failed to ping embedding server")?;

        Ok(())
    }

    fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts.to_vec(),
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embeddings")?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            ));
        }

        for embedding in &response.embeddings {
            if embedding.len() != self.dimension {
                return Err(anyhow!(
                    "Server returned {}-dimensional vector, expected {}; \
                     run a full re-embedding migration after changing models",
                    embedding.len(),
                    self.dimension
                ));
            }
        }

        Ok(response.embeddings)
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                return Err(anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => false,
                    };

                    if !should_retry {
                        return Err(anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        std::thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Request failed after retries")))
    }
}

impl EmbeddingProvider for RemoteEmbedder {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let mut embeddings = self.embed_texts(&[text])?;
        embeddings
            .pop()
            .ok_or_else(|| anyhow!("Server returned no embedding"))
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            let embeddings = self
                .embed_texts(&refs)
                .with_context(|| format!("Failed to process batch of {} texts", batch.len()))?;
            results.extend(embeddings);
        }

        Ok(results)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn is_available(&self) -> bool {
        self.ping().is_ok()
    }

    #[inline]
    fn name(&self) -> &'static str {
        "remote"
    }

    #[inline]
    fn policy(&self) -> ProviderPolicy {
        ProviderPolicy {
            request_delay: self.request_delay,
        }
    }
}
