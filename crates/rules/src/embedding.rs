//! Embedders for the rules index.
//!
//! - [`HashingEmbedder`]: offline feature hashing, the default
//! - [`ProviderEmbedder`]: a provider's `/embeddings` endpoint

use std::sync::Arc;

use async_trait::async_trait;
use judgebot_config::{EmbeddingBackend, EmbeddingConfig};
use judgebot_core::embedding::Embedder;
use judgebot_core::error::IndexError;
use judgebot_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedder.
///
/// Lowercased word unigrams and adjacent-word bigrams are hashed (FNV-1a)
/// into a fixed number of buckets. The top hash bit picks the sign so that
/// collisions tend to cancel instead of pile up. The result is L2-normalized,
/// so the Euclidean distance between two texts lies in `[0, 2]`.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        for word in &words {
            self.add_feature(&mut vector, word.as_bytes());
        }
        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut vector, bigram.as_bytes());
        }

        normalize(&mut vector);
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8]) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Embeds through an LLM provider (e.g. OpenAI `text-embedding-3-small`).
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimensions: usize,
    name: String,
}

impl ProviderEmbedder {
    /// `dimensions` must match what the model returns; every response is checked.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimensions: usize) -> Self {
        let model = model.into();
        let name = format!("{}:{}", provider.name(), model);
        Self {
            provider,
            model,
            dimensions,
            name,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        debug!(embedder = %self.name, count = texts.len(), "Requesting embeddings");

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        if let Some(bad) = response.embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(IndexError::Embedding(format!(
                "{} returned {} dimensions, configured for {}",
                self.name,
                bad.len(),
                self.dimensions
            )));
        }

        Ok(response.embeddings)
    }
}

/// Build the configured embedder.
///
/// `provider` is only consulted for the provider backend; it is an error to
/// select that backend without one.
pub fn from_config(
    config: &EmbeddingConfig,
    provider: Option<Arc<dyn Provider>>,
) -> Result<Arc<dyn Embedder>, IndexError> {
    match config.backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
        EmbeddingBackend::Provider => {
            let provider = provider.ok_or_else(|| {
                IndexError::Embedding(format!(
                    "embedding provider '{}' is not configured",
                    config.provider
                ))
            })?;
            Ok(Arc::new(ProviderEmbedder::new(
                provider,
                &config.model,
                config.dimensions,
            )))
        }
    }
}
