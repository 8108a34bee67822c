use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::PdfQaError;
use crate::types::{EMBEDDING_DIMENSION, MIN_CHUNK_CHARS};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for PdfQaError {
    fn from(err: ConfigError) -> Self {
        PdfQaError::Configuration(err.to_string())
    }
}

/// Main configuration for PdfQA
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PdfQaConfig {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation oracle configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Chunking policy
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Ranking and context assembly
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Worker pool sizing
    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named question presets, selectable instead of a free-form query
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider: "openai", "hash" (offline, deterministic) or "auto"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Texts sent per provider request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_base: default_openai_api_base(),
            openai_api_key: None,
            dimension: default_embedding_dimension(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Generation oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// LLM provider: "openai"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_openai_api_base")]
    pub base_url: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_openai_api_base(),
            openai_api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Chunking policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Strategy: "word", "page" or "char"
    #[serde(default = "default_chunk_strategy")]
    pub strategy: String,

    /// Window size in words or characters (ignored for "page")
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,

    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: default_chunk_strategy(),
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
        }
    }
}

/// Ranking and context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Prefix each context block with source/page/score
    #[serde(default = "default_annotate_context")]
    pub annotate_context: bool,

    /// Drop ranked chunks scoring below this value
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            annotate_context: default_annotate_context(),
            min_score: None,
        }
    }
}

/// Performance and resource configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Rayon threads used for chunk construction
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// Maximum in-flight embedding requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_embeddings: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            num_threads: default_num_threads(),
            max_concurrent_embeddings: default_max_concurrent(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_embedding_provider() -> String {
    "auto".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_dimension() -> usize {
    EMBEDDING_DIMENSION
}
fn default_batch_size() -> usize {
    16
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> usize {
    2
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> usize {
    250
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_chunk_strategy() -> String {
    "word".to_string()
}
fn default_chunk_size() -> usize {
    100
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_min_chunk_chars() -> usize {
    MIN_CHUNK_CHARS
}
fn default_top_k() -> usize {
    4
}
fn default_annotate_context() -> bool {
    true
}
fn default_num_threads() -> usize {
    num_cpus::get()
}
fn default_max_concurrent() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with file, dotenv and environment layering
pub struct ConfigManager {
    config: PdfQaConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.pdfqa.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading PdfQA configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load from an explicit TOML file, still applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: PdfQaConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Config file: {}", path.display()),
            None => info!("Config file: NONE (using defaults)"),
        }
        info!(
            "Embedding provider: {} ({}), chunking: {} {}/{}, top-k: {}",
            config.embedding.provider,
            config.embedding.model,
            config.chunking.strategy,
            config.chunking.chunk_size,
            config.chunking.overlap,
            config.retrieval.top_k
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".pdfqa.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .pdfqa.env: {}", e);
                }
            }
        }
    }

    /// Search order:
    /// 1. ./.pdfqa.toml
    /// 2. ~/.pdfqa/config.toml
    /// 3. defaults
    fn load_config_file() -> Result<(PdfQaConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".pdfqa.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".pdfqa").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((PdfQaConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<PdfQaConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: PdfQaConfig) -> PdfQaConfig {
        // OPENAI_KEY is what older deployments exported
        if let Ok(key) = std::env::var("OPENAI_API_KEY").or_else(|_| std::env::var("OPENAI_KEY")) {
            if config.embedding.openai_api_key.is_none() {
                config.embedding.openai_api_key = Some(key.clone());
            }
            if config.llm.openai_api_key.is_none() {
                config.llm.openai_api_key = Some(key);
            }
        }
        if let Ok(provider) = std::env::var("PDFQA_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(model) = std::env::var("PDFQA_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(model) = std::env::var("PDFQA_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(strategy) = std::env::var("PDFQA_CHUNK_STRATEGY") {
            config.chunking.strategy = strategy;
        }
        if let Some(size) = env_parse("PDFQA_CHUNK_SIZE") {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = env_parse("PDFQA_CHUNK_OVERLAP") {
            config.chunking.overlap = overlap;
        }
        if let Some(top_k) = env_parse("PDFQA_TOP_K") {
            config.retrieval.top_k = top_k;
        }
        if let Some(max) = env_parse("PDFQA_MAX_CONCURRENT") {
            config.performance.max_concurrent_embeddings = max;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    pub fn validate_config(config: &PdfQaConfig) -> Result<(), ConfigError> {
        match config.embedding.provider.as_str() {
            "auto" | "openai" | "hash" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid embedding provider: {}. Must be one of: auto, openai, hash",
                    other
                )))
            }
        }

        if config.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        match config.llm.provider.as_str() {
            "openai" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid LLM provider: {}. Must be: openai",
                    other
                )))
            }
        }

        match canonical_strategy_name(&config.chunking.strategy) {
            Some("word") | Some("char") => {
                if config.chunking.chunk_size == 0 {
                    return Err(ConfigError::ValidationError(
                        "chunk_size must be greater than 0".to_string(),
                    ));
                }
                if config.chunking.overlap >= config.chunking.chunk_size {
                    return Err(ConfigError::ValidationError(format!(
                        "overlap ({}) must be smaller than chunk_size ({})",
                        config.chunking.overlap, config.chunking.chunk_size
                    )));
                }
            }
            Some(_) => {}
            None => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid chunking strategy: {}. Must be one of: word, page, char",
                    config.chunking.strategy
                )))
            }
        }

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "top_k must be greater than 0".to_string(),
            ));
        }

        if config.performance.max_concurrent_embeddings == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_embeddings must be greater than 0".to_string(),
            ));
        }

        // RUST_LOG may carry directives like "pdfqa=debug"; only plain levels are checked
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &PdfQaConfig {
        &self.config
    }

    pub fn into_config(self) -> PdfQaConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = PdfQaConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

/// Canonical name (`word`, `page` or `char`) of a chunking strategy.
/// Accepts any case and the plural spellings.
pub fn canonical_strategy_name(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "word" | "words" => Some("word"),
        "page" | "pages" => Some("page"),
        "char" | "chars" | "character" | "characters" => Some("char"),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
