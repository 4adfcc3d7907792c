//! Configuration module for the document retrieval service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCRAG_` and use double
//! underscores to separate nested levels:
//! - `DOCRAG_CHUNKING__CHUNK_CHARS=800` sets `chunking.chunk_chars`
//! - `DOCRAG_SERVER__BIND=0.0.0.0:8000` sets `server.bind`
//! - `DOCRAG_EMBEDDING__PROVIDER=openai` sets `embedding.provider`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::documents::ChunkingConfig;

/// Directory holding the settings file, searched for in ancestor directories.
pub const CONFIG_DIR: &str = ".docrag";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "DOCRAG_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the document corpus
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    /// Workspace root directory (where .docrag is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Chunk size and overlap
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding collaborator settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text generation collaborator settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Query-time limits
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which embedding backend to use.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local ONNX model through fastembed
    Fastembed,
    /// OpenAI-compatible `/embeddings` endpoint
    Openai,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    /// Model name. A fastembed model id for `fastembed`, the remote model
    /// name for `openai`.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Requested output dimensionality (remote providers only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Texts sent per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Where local models are cached (defaults to the user cache directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Context chunks used when a request does not ask for a number
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Upper bound on context chunks per request
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Characters of document text handed to a risk assessment
    #[serde(default = "default_risk_context_chars")]
    pub risk_context_chars: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Concurrent collaborator calls (embedding and generation)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Rebuild the index from the corpus before accepting requests
    #[serde(default = "default_true")]
    pub index_on_startup: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `index = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_corpus_path() -> PathBuf {
    PathBuf::from("documents")
}
fn default_true() -> bool {
    true
}
fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Fastembed
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_batch_size() -> usize {
    64
}
fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_top_k() -> usize {
    3
}
fn default_max_top_k() -> usize {
    20
}
fn default_risk_context_chars() -> usize {
    10_000
}
fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}
fn default_worker_threads() -> usize {
    num_cpus::get()
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            corpus_path: default_corpus_path(),
            workspace_root: None,
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            base_url: default_openai_base_url(),
            api_key_env: default_api_key_env(),
            dimensions: None,
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
            cache_dir: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            risk_context_chars: default_risk_context_chars(),
        }
    }
}

impl RetrievalConfig {
    /// Clamp a requested context size into `[1, max_top_k]`.
    pub fn clamp_top_k(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_top_k)
            .clamp(1, self.max_top_k.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            worker_threads: default_worker_threads(),
            index_on_startup: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .docrag directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // If workspace_root is not set in config, detect it
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let path = path.as_ref();
        Self::figment(path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = path
                        .parent()
                        .and_then(Path::parent)
                        .map(Path::to_path_buf);
                }
                settings
            })
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels; single underscores
            // stay inside field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the settings file by looking for .docrag in ancestor directories
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .docrag is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Corpus directory, resolved against the workspace root when relative.
    pub fn resolved_corpus_path(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.corpus_path.is_relative() => root.join(&self.corpus_path),
            _ => self.corpus_path.clone(),
        }
    }

    /// Check invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), String> {
        self.chunking
            .validate()
            .map_err(|e| format!("[chunking] {e}"))?;

        if self.embedding.batch_size == 0 {
            return Err("[embedding] batch_size must be greater than zero".to_string());
        }
        if self.retrieval.max_top_k == 0 {
            return Err("[retrieval] max_top_k must be greater than zero".to_string());
        }
        if self.retrieval.risk_context_chars == 0 {
            return Err("[retrieval] risk_context_chars must be greater than zero".to_string());
        }
        if self.server.max_upload_bytes == 0 {
            return Err("[server] max_upload_bytes must be greater than zero".to_string());
        }
        if self.server.worker_threads == 0 {
            return Err("[server] worker_threads must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file and corpus directory under `root`
    pub fn init_config_file(root: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings::default();
        settings.save(&config_path)?;

        let corpus = root.join(&settings.corpus_path);
        std::fs::create_dir_all(&corpus)?;

        Ok(config_path)
    }
}
