//! Rules ingestion: fetch the Comprehensive Rules text, chunk it, and
//! rebuild the persisted collection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use judgebot_config::RulesConfig;
use judgebot_core::embedding::Embedder;
use judgebot_core::error::IndexError;
use thiserror::Error;
use tracing::{info, warn};

use crate::chunker::{section_counts, ChunkerConfig, RuleChunker};
use crate::index::RulesIndex;
use crate::store::CollectionStore;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Could not download {url} ({reason}) and no local copy exists at {}", .local.display())]
    NoSource {
        url: String,
        reason: String,
        local: PathBuf,
    },

    #[error("Failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("No rules were parsed; the file format may have changed")]
    NoChunks,

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Where to take the rules text from.
#[derive(Debug, Clone, Default)]
pub enum SourceChoice {
    /// The configured URL, falling back to the configured local file
    #[default]
    Configured,
    /// This URL, falling back to the configured local file
    Url(String),
    /// This file only
    File(PathBuf),
}

/// Where the rules text actually came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RulesSource {
    Downloaded(String),
    LocalFile(PathBuf),
}

impl std::fmt::Display for RulesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloaded(url) => write!(f, "{url}"),
            Self::LocalFile(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub source: RulesSource,
    pub characters: usize,
    pub chunks: usize,
    pub sections: BTreeMap<String, usize>,
    pub path: PathBuf,
}

/// GET the rules document.
pub async fn download_rules(url: &str, user_agent: &str) -> Result<String, IngestError> {
    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .user_agent(user_agent)
        .build()
        .map_err(|e| IngestError::Download(e.to_string()))?;

    info!(url, "Downloading Comprehensive Rules");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::Download(e.to_string()))?
        .error_for_status()
        .map_err(|e| IngestError::Download(e.to_string()))?;

    let text = response
        .text()
        .await
        .map_err(|e| IngestError::Download(e.to_string()))?;
    info!(characters = text.len(), "Downloaded rules");
    Ok(text)
}

async fn read_local(path: &Path) -> Result<String, IngestError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IngestError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Fetch the rules text per `choice`.
pub async fn load_rules_text(
    choice: &SourceChoice,
    config: &RulesConfig,
    user_agent: &str,
) -> Result<(String, RulesSource), IngestError> {
    let url = match choice {
        SourceChoice::File(path) => {
            let text = read_local(path).await?;
            return Ok((text, RulesSource::LocalFile(path.clone())));
        }
        SourceChoice::Url(url) => url.as_str(),
        SourceChoice::Configured => config.source_url.as_str(),
    };

    match download_rules(url, user_agent).await {
        Ok(text) => Ok((text, RulesSource::Downloaded(url.to_string()))),
        Err(e) => {
            let local = config.local_file();
            warn!(error = %e, local = %local.display(), "Download failed, trying local copy");
            if !local.is_file() {
                return Err(IngestError::NoSource {
                    url: url.to_string(),
                    reason: e.to_string(),
                    local,
                });
            }
            let text = read_local(&local).await?;
            Ok((text, RulesSource::LocalFile(local)))
        }
    }
}

/// Chunk `text` with the configured minimum length and rebuild the collection.
pub async fn ingest_text(
    text: &str,
    source: RulesSource,
    config: &RulesConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<IngestReport, IngestError> {
    let chunker = RuleChunker::new(ChunkerConfig {
        min_text_len: config.min_rule_length,
        ..ChunkerConfig::default()
    });
    let chunks = chunker.parse(text);
    if chunks.is_empty() {
        return Err(IngestError::NoChunks);
    }

    let sections = section_counts(&chunks);
    info!(chunks = chunks.len(), sections = sections.len(), "Parsed rule chunks");

    let store = CollectionStore::new(config.data_dir(), &config.collection);
    let index = RulesIndex::build(chunks, embedder, &store, config.batch_size).await?;

    Ok(IngestReport {
        source,
        characters: text.chars().count(),
        chunks: index.len(),
        sections,
        path: store.path(),
    })
}

/// The whole pipeline: fetch, chunk, embed, persist.
pub async fn run(
    choice: &SourceChoice,
    config: &RulesConfig,
    user_agent: &str,
    embedder: Arc<dyn Embedder>,
) -> Result<IngestReport, IngestError> {
    let (text, source) = load_rules_text(choice, config, user_agent).await?;
    ingest_text(&text, source, config, embedder).await
}
