use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Collection name used when `[store].collection` is not set.
pub const DEFAULT_COLLECTION: &str = "finchat_docs";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub uploads: UploadsConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub ocr: OcrConfig,
    pub workers: WorkersConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the persisted vector store.
    pub path: PathBuf,
    /// Fixed for the lifetime of a deployment.
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./vector_db"),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadsConfig {
    pub dir: PathBuf,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./docs"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            overlap_tokens: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Chunks scoring below this are dropped. `None` keeps every top-k hit.
    pub similarity_floor: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_floor: None,
        }
    }
}

/// Ollama embedding model used when `[embedding].model` is not set.
pub const DEFAULT_OLLAMA_EMBED_MODEL: &str = "nomic-embed-text";
const DEFAULT_OLLAMA_EMBED_DIMS: usize = 768;
/// fastembed model used when `[embedding].model` is not set.
pub const DEFAULT_LOCAL_EMBED_MODEL: &str = "bge-large-en-v1.5";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    /// Unset means the provider default.
    pub model: Option<String>,
    /// Unset means the provider default for the default model. The local
    /// provider derives it from the model.
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    pub url: Option<String>,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 32,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    /// Configured model, or the provider default.
    pub fn model_name(&self) -> Option<&str> {
        match (self.model.as_deref(), self.provider.as_str()) {
            (Some(model), _) => Some(model),
            (None, "ollama") => Some(DEFAULT_OLLAMA_EMBED_MODEL),
            (None, "local") => Some(DEFAULT_LOCAL_EMBED_MODEL),
            _ => None,
        }
    }

    /// Configured dimensionality. A provider default applies only when the
    /// model is defaulted too.
    pub fn resolved_dims(&self) -> Option<usize> {
        match (self.dims, self.model.as_deref(), self.provider.as_str()) {
            (Some(dims), _, _) => Some(dims),
            (None, None, "ollama") => Some(DEFAULT_OLLAMA_EMBED_DIMS),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "mistral".to_string(),
            url: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable name or path.
    pub command: String,
    /// Tesseract language list, e.g. `eng` or `eng+deu`.
    pub languages: String,
    /// Regions recognised with lower confidence (0.0–1.0) are dropped.
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            languages: "eng".to_string(),
            min_confidence: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkersConfig {
    /// Concurrent slots for blocking capability calls (parsing, OCR, embedding, generation).
    pub blocking_slots: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { blocking_slots: 4 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            max_upload_mb: 64,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate a TOML config document.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.store.collection.trim().is_empty() {
            bail!("store.collection must not be empty");
        }

        if self.chunking.max_tokens == 0 {
            bail!("chunking.max_tokens must be > 0");
        }
        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            bail!("chunking.overlap_tokens must be smaller than chunking.max_tokens");
        }

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if let Some(floor) = self.retrieval.similarity_floor {
            if !(-1.0..=1.0).contains(&floor) {
                bail!("retrieval.similarity_floor must be in [-1.0, 1.0]");
            }
        }

        match self.embedding.provider.as_str() {
            "disabled" => {}
            "local" => {
                if self.embedding.dims == Some(0) {
                    bail!("embedding.dims must be > 0 when set");
                }
            }
            "openai" | "ollama" => {
                if matches!(self.embedding.resolved_dims(), None | Some(0)) {
                    bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        self.embedding.provider
                    );
                }
                if self.embedding.model_name().is_none() {
                    bail!(
                        "embedding.model must be specified when provider is '{}'",
                        self.embedding.provider
                    );
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, ollama, openai, or local.",
                other
            ),
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }

        match self.generation.provider.as_str() {
            "disabled" | "ollama" | "openai" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be disabled, ollama, or openai.",
                other
            ),
        }
        if self.generation.timeout_secs == 0 || self.embedding.timeout_secs == 0 {
            bail!("timeout_secs must be > 0");
        }

        if self.workers.blocking_slots == 0 {
            bail!("workers.blocking_slots must be >= 1");
        }

        Ok(())
    }
}
