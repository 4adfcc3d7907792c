//! Embedding collaborators: chunk texts in, fixed-dimension vectors out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::EmbeddingError;
use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::openai::OpenAiClient;

/// Turns texts into vectors of a fixed dimensionality.
///
/// A batch either yields one vector per input, in input order, or fails
/// as a whole.
pub trait EmbeddingGenerator: Send + Sync {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Embed `texts` in batches of `batch_size`, all or nothing.
///
/// Fails if any batch fails, returns the wrong number of vectors, or
/// returns a vector of the wrong dimensionality.
pub fn embed_all(
    generator: &dyn EmbeddingGenerator,
    texts: &[&str],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let expected_dim = generator.dimension();
    let mut vectors = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = generator.embed_batch(batch)?;

        if embedded.len() != batch.len() {
            return Err(EmbeddingError::BatchFailed(format!(
                "expected {} vectors, got {}",
                batch.len(),
                embedded.len()
            )));
        }
        if let Some(bad) = embedded.iter().find(|v| v.len() != expected_dim) {
            return Err(EmbeddingError::BatchFailed(format!(
                "expected dimension {expected_dim}, got {}",
                bad.len()
            )));
        }

        vectors.extend(embedded);
    }

    Ok(vectors)
}

/// Embed a single query text.
pub fn embed_query(
    generator: &dyn EmbeddingGenerator,
    query: &str,
) -> Result<Vec<f32>, EmbeddingError> {
    embed_all(generator, &[query], 1)?
        .pop()
        .ok_or_else(|| EmbeddingError::BatchFailed("no vector for query".to_string()))
}

/// Build the configured embedding collaborator.
///
/// Constructs blocking clients; call before entering an async runtime or
/// from a blocking thread.
pub fn embedder_from_settings(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingGenerator>, EmbeddingError> {
    match config.provider {
        EmbeddingProvider::Fastembed => {
            let model = parse_model(&config.model).ok_or_else(|| {
                EmbeddingError::ModelInit(format!(
                    "unknown fastembed model '{}' (expected one of: {})",
                    config.model,
                    SUPPORTED_MODELS.join(", ")
                ))
            })?;
            let cache_dir = config.cache_dir.clone().unwrap_or_else(default_models_dir);
            Ok(Arc::new(FastEmbedGenerator::new(model, cache_dir)?))
        }
        EmbeddingProvider::Openai => Ok(Arc::new(OpenAiEmbedder::from_settings(config)?)),
    }
}

/// Local model names accepted in configuration.
pub const SUPPORTED_MODELS: &[&str] = &[
    "AllMiniLML6V2",
    "BGESmallENV15",
    "BGEBaseENV15",
    "NomicEmbedTextV15",
    "MultilingualE5Small",
];

/// Parse a fastembed model from its configuration name.
pub fn parse_model(name: &str) -> Option<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" => Some(EmbeddingModel::AllMiniLML6V2),
        "BGESmallENV15" => Some(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Some(EmbeddingModel::BGEBaseENV15),
        "NomicEmbedTextV15" => Some(EmbeddingModel::NomicEmbedTextV15),
        "MultilingualE5Small" => Some(EmbeddingModel::MultilingualE5Small),
        _ => None,
    }
}

/// Default location for downloaded local models.
pub fn default_models_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("docrag").join("models"))
        .unwrap_or_else(|| PathBuf::from(".docrag/models"))
}

/// Local ONNX embedding model through fastembed.
pub struct FastEmbedGenerator {
    /// The embedding model (wrapped in Mutex for interior mutability)
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedGenerator {
    pub fn new(model: EmbeddingModel, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_name = format!("{model:?}");
        tracing::info!(
            target: "embedding",
            "loading {model_name} (cache: {})",
            cache_dir.display()
        );

        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(true),
        )
        .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        // Get dimensions by generating a test embedding
        let dimension = text_model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?
            .into_iter()
            .next()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::ModelInit("model returned no test embedding".into()))?;

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
            model_name,
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.model
            .lock()
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::BatchFailed(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dimensions: Option<usize>,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// Build from configuration and detect the output dimensionality.
    pub fn from_settings(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.model.trim().is_empty() {
            return Err(EmbeddingError::ModelInit("missing embedding model name".into()));
        }

        let client = OpenAiClient::from_env(
            &config.base_url,
            &config.api_key_env,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
        .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        let mut embedder = Self {
            client,
            model: config.model.clone(),
            dimensions: config.dimensions,
            dimension: 0,
        };

        embedder.dimension = embedder
            .request(&["test"])
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?
            .first()
            .map(Vec::len)
            .ok_or_else(|| EmbeddingError::ModelInit("endpoint returned no embedding".into()))?;

        tracing::info!(
            target: "embedding",
            "remote embeddings ready: {} ({} dimensions)",
            embedder.model,
            embedder.dimension
        );

        Ok(embedder)
    }

    fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };
        let mut parsed: EmbeddingResponse = self
            .client
            .post_json("embeddings", &request)
            .map_err(|e| EmbeddingError::BatchFailed(e.to_string()))?;

        parsed.data.sort_by_key(|entry| entry.index);
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

impl EmbeddingGenerator for OpenAiEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `[len, 1.0]` per text and counts calls.
    struct LengthEmbedder {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
        short_by: usize,
    }

    impl LengthEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_call: None,
                short_by: 0,
            }
        }
    }

    impl EmbeddingGenerator for LengthEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                return Err(EmbeddingError::BatchFailed("rate limited".into()));
            }
            let keep = texts.len().saturating_sub(self.short_by);
            Ok(texts[..keep]
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    #[test]
    fn test_embed_all_batches_in_order() {
        let embedder = LengthEmbedder::new();
        let texts = ["a", "bb", "ccc", "dddd", "eeeee"];

        let vectors = embed_all(&embedder, &texts, 2).unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_failed_batch_fails_everything() {
        let embedder = LengthEmbedder {
            fail_on_call: Some(1),
            ..LengthEmbedder::new()
        };
        let err = embed_all(&embedder, &["a", "b", "c"], 2).unwrap_err();
        assert_eq!(err, EmbeddingError::BatchFailed("rate limited".into()));
    }

    #[test]
    fn test_short_batch_is_rejected() {
        let embedder = LengthEmbedder {
            short_by: 1,
            ..LengthEmbedder::new()
        };
        assert!(matches!(
            embed_all(&embedder, &["a", "b"], 8),
            Err(EmbeddingError::BatchFailed(_))
        ));
    }

    #[test]
    fn test_embed_query() {
        let embedder = LengthEmbedder::new();
        assert_eq!(embed_query(&embedder, "four").unwrap(), vec![4.0, 1.0]);
    }

    #[test]
    fn test_parse_model_names() {
        for name in SUPPORTED_MODELS {
            assert!(parse_model(name).is_some(), "{name}");
        }
        assert!(parse_model("gpt-embeddings").is_none());
    }

    #[test]
    fn test_unknown_local_model_fails_before_loading() {
        let config = EmbeddingConfig {
            model: "NotAModel".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = embedder_from_settings(&config).err().unwrap();
        assert!(matches!(err, EmbeddingError::ModelInit(msg) if msg.contains("NotAModel")));
    }
}
