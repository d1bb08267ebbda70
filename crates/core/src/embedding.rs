//! Embedder trait: turns text into vectors for the rules index.

use async_trait::async_trait;

use crate::error::IndexError;

/// Produces fixed-size embedding vectors.
///
/// The same embedder (by `name` and `dimensions`) must be used to build a
/// collection and to query it; the rules index checks this on load.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in the collection manifest.
    fn name(&self) -> &str;

    /// Vector length produced by this embedder.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError>;

    /// Embed a single query string.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| IndexError::Embedding("embedder returned no vector".into()))
    }
}
