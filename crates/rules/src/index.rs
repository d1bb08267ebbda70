//! The in-memory rules index and its loaders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use judgebot_core::embedding::Embedder;
use judgebot_core::error::IndexError;
use serde::Serialize;
use tracing::{debug, info};

use crate::chunker::RuleChunk;
use crate::distance;
use crate::store::{CollectionManifest, CollectionStore, IndexEntry};

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleHit {
    pub chunk: RuleChunk,
    /// Euclidean distance to the query; smaller is more relevant
    pub distance: f32,
}

/// Rule chunks with their embeddings, queryable by nearest neighbour.
pub struct RulesIndex {
    manifest: CollectionManifest,
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for RulesIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesIndex")
            .field("manifest", &self.manifest)
            .field("entries", &self.entries.len())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl RulesIndex {
    pub fn from_parts(
        manifest: CollectionManifest,
        entries: Vec<IndexEntry>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            manifest,
            entries,
            embedder,
        }
    }

    /// Full rebuild: embed every chunk and replace the persisted collection.
    pub async fn build(
        chunks: Vec<RuleChunk>,
        embedder: Arc<dyn Embedder>,
        store: &CollectionStore,
        batch_size: usize,
    ) -> Result<Self, IndexError> {
        let total = chunks.len();
        let batch_size = batch_size.max(1);

        if store.exists() {
            info!(collection = %store.name(), "Replacing existing collection");
        }

        let mut entries = Vec::with_capacity(total);
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "{} returned {} vectors for {} texts",
                    embedder.name(),
                    vectors.len(),
                    batch.len()
                )));
            }
            if let Some(v) = vectors.iter().find(|v| v.len() != embedder.dimensions()) {
                return Err(IndexError::Embedding(format!(
                    "{} returned a {}-dimension vector, expected {}",
                    embedder.name(),
                    v.len(),
                    embedder.dimensions()
                )));
            }

            entries.extend(batch.iter().cloned().zip(vectors).map(|(chunk, embedding)| {
                IndexEntry { chunk, embedding }
            }));
            info!(processed = entries.len(), total, "Embedded rule chunks");
        }

        let manifest = CollectionManifest {
            collection: store.name().to_string(),
            embedder: embedder.name().to_string(),
            dimensions: embedder.dimensions(),
            chunk_count: entries.len(),
            built_at: Utc::now(),
        };
        let writer = store.clone();
        let (manifest, entries) = tokio::task::spawn_blocking(move || {
            writer.write(&manifest, &entries).map(|()| (manifest, entries))
        })
        .await
        .map_err(|e| IndexError::Storage(format!("Index write task failed: {e}")))??;

        Ok(Self::from_parts(manifest, entries, embedder))
    }

    pub fn manifest(&self) -> &CollectionManifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embed `text` and return the `k` nearest chunks.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<RuleHit>, IndexError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed_one(text).await?;
        self.query_embedding(&embedding, k)
    }

    /// The `k` chunks nearest to `embedding`, by ascending L2 distance.
    pub fn query_embedding(&self, embedding: &[f32], k: usize) -> Result<Vec<RuleHit>, IndexError> {
        if embedding.len() != self.manifest.dimensions {
            return Err(IndexError::Embedding(format!(
                "query has {} dimensions, index has {}",
                embedding.len(),
                self.manifest.dimensions
            )));
        }

        let hits = distance::nearest(embedding, self.entries.iter().map(|e| e.embedding.as_slice()), k)
            .into_iter()
            .map(|(i, distance)| RuleHit {
                chunk: self.entries[i].chunk.clone(),
                distance,
            })
            .collect::<Vec<_>>();

        debug!(k, hits = hits.len(), "Rules index queried");
        Ok(hits)
    }
}

/// Produces a ready index. Implemented by [`StoreLoader`]; tests swap in
/// their own to observe how often loading happens.
#[async_trait]
pub trait IndexLoader: Send + Sync {
    async fn load(&self) -> Result<RulesIndex, IndexError>;
}

/// Loads a persisted collection from disk.
pub struct StoreLoader {
    store: CollectionStore,
    embedder: Arc<dyn Embedder>,
}

impl StoreLoader {
    pub fn new(store: CollectionStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl IndexLoader for StoreLoader {
    async fn load(&self) -> Result<RulesIndex, IndexError> {
        let store = self.store.clone();
        let (manifest, entries) = tokio::task::spawn_blocking(move || store.read())
            .await
            .map_err(|e| IndexError::Storage(format!("Index load task failed: {e}")))??;

        if manifest.embedder != self.embedder.name() || manifest.dimensions != self.embedder.dimensions() {
            return Err(IndexError::Corrupt(format!(
                "collection was built with {} ({} dims) but the configured embedder is {} ({} dims); run `judgebot ingest` again",
                manifest.embedder,
                manifest.dimensions,
                self.embedder.name(),
                self.embedder.dimensions()
            )));
        }

        info!(
            collection = %manifest.collection,
            entries = entries.len(),
            embedder = %manifest.embedder,
            "Rules index loaded"
        );
        Ok(RulesIndex::from_parts(manifest, entries, self.embedder.clone()))
    }
}
