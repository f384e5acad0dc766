
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Which embedding backend is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// In-process hashed embedder, always available
    Local,
    /// Ollama-compatible HTTP endpoint
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub embedding_dimension: u32,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    /// Pause between consecutive embed calls, for rate-limited remote
    /// endpoints. Ignored by the local provider.
    pub request_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Remote,
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: 16,
            timeout_seconds: 30,
            request_delay_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 8 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid chunk size: {0} (must be between 1 and 4096 words)")]
    InvalidChunkSize(usize),
    #[error("Overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                provider: ProviderConfig::default(),
                chunking: ChunkingConfig::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;

        if self.chunking.chunk_size == 0 || self.chunking.chunk_size > 4096 {
            return Err(ConfigError::InvalidChunkSize(self.chunking.chunk_size));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunking.overlap,
                self.chunking.chunk_size,
            ));
        }

        Ok(())
    }

    /// Path to the SQLite corpus database
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join("corpus.db")
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(8..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 600 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

/// Default configuration directory (`~/.config/ragstore` or platform
/// equivalent).
#[inline]
pub fn get_config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or(ConfigError::DirectoryError)?
        .join("ragstore");
    fs::create_dir_all(&dir).map_err(|_| ConfigError::DirectoryError)?;
    Ok(dir)
}
