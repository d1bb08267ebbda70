//! Comprehensive Rules knowledge base for judgebot.
//!
//! - [`chunker`]: rules text to [`RuleChunk`]s
//! - [`embedding`]: hashing and provider-backed [`Embedder`](judgebot_core::Embedder)s
//! - [`store`]: the JSON-lines collection on disk
//! - [`index`]: nearest-neighbour search over a loaded collection
//! - [`shared`]: the lazily loaded, process-wide index handle
//! - [`ingest`]: download, chunk, embed, persist

pub mod chunker;
pub mod distance;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod shared;
pub mod store;

pub use chunker::{ChunkerConfig, RuleChunk, RuleChunker, section_counts};
pub use embedding::{HashingEmbedder, ProviderEmbedder};
pub use index::{IndexLoader, RuleHit, RulesIndex, StoreLoader};
pub use ingest::{IngestError, IngestReport, RulesSource, SourceChoice};
pub use shared::{IndexState, SharedRulesIndex};
pub use store::{CollectionManifest, CollectionStore, IndexEntry};
