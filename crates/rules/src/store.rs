//! JSON-lines collection store.
//!
//! A collection lives at `<dir>/<name>.jsonl`. The first line is a header
//! record with the [`CollectionManifest`]; every following line is one entry
//! (chunk metadata, text, and embedding). Human-inspectable and diffable.
//!
//! Writes go to `<name>.jsonl.tmp` and are renamed over the live file, so a
//! reader never sees a half-written collection and a failed rebuild leaves
//! the previous one intact.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use judgebot_core::error::IndexError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunker::RuleChunk;

/// Describes how a persisted collection was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionManifest {
    pub collection: String,
    /// [`Embedder::name`](judgebot_core::Embedder::name) used at build time
    pub embedder: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

/// A chunk with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: RuleChunk,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Header(CollectionManifest),
    Entry(StoredEntry),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    rule_number: String,
    section: String,
    #[serde(default)]
    section_name: String,
    text: String,
    embedding: Vec<f32>,
}

impl From<&IndexEntry> for StoredEntry {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            id: entry.chunk.id.clone(),
            rule_number: entry.chunk.rule_number.clone(),
            section: entry.chunk.section.clone(),
            section_name: entry.chunk.section_title.clone().unwrap_or_default(),
            text: entry.chunk.text.clone(),
            embedding: entry.embedding.clone(),
        }
    }
}

impl From<StoredEntry> for IndexEntry {
    fn from(stored: StoredEntry) -> Self {
        Self {
            chunk: RuleChunk {
                id: stored.id,
                rule_number: stored.rule_number,
                text: stored.text,
                section: stored.section,
                section_title: Some(stored.section_name).filter(|s| !s.is_empty()),
            },
            embedding: stored.embedding,
        }
    }
}

/// A named collection in a data directory.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    dir: PathBuf,
    name: String,
}

impl CollectionStore {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.jsonl", self.name))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.jsonl.tmp", self.name))
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Replace the collection with `entries`.
    pub fn write(&self, manifest: &CollectionManifest, entries: &[IndexEntry]) -> Result<(), IndexError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            IndexError::Storage(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        let temp = self.temp_path();
        let result = write_records(&temp, manifest, entries).and_then(|()| {
            fs::rename(&temp, self.path()).map_err(|e| {
                IndexError::Storage(format!("Failed to replace {}: {e}", self.path().display()))
            })
        });

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        } else {
            debug!(path = %self.path().display(), entries = entries.len(), "Collection written");
        }
        result
    }

    /// Read the manifest and every readable entry.
    ///
    /// A missing file is [`IndexError::NotAvailable`]; a missing or invalid
    /// header is [`IndexError::Corrupt`]. Unparseable entry lines, and entries
    /// whose embedding length differs from the manifest, are skipped.
    pub fn read(&self) -> Result<(CollectionManifest, Vec<IndexEntry>), IndexError> {
        let path = self.path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::NotAvailable(format!(
                    "collection '{}' not found at {}",
                    self.name,
                    path.display()
                )));
            }
            Err(e) => {
                return Err(IndexError::Storage(format!("Failed to open {}: {e}", path.display())));
            }
        };

        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .transpose()
            .map_err(|e| IndexError::Storage(e.to_string()))?
            .ok_or_else(|| IndexError::Corrupt(format!("{} is empty", path.display())))?;
        let manifest = match serde_json::from_str::<Record>(&header) {
            Ok(Record::Header(manifest)) => manifest,
            Ok(Record::Entry(_)) | Err(_) => {
                return Err(IndexError::Corrupt(format!(
                    "{} does not start with a collection header",
                    path.display()
                )));
            }
        };

        let mut entries = Vec::with_capacity(manifest.chunk_count);
        for (n, line) in lines.enumerate() {
            let line = line.map_err(|e| IndexError::Storage(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(&line) {
                Ok(Record::Entry(stored)) if stored.embedding.len() != manifest.dimensions => warn!(
                    line = n + 2,
                    rule = %stored.rule_number,
                    found = stored.embedding.len(),
                    expected = manifest.dimensions,
                    "Skipping index entry with wrong embedding length"
                ),
                Ok(Record::Entry(stored)) => entries.push(stored.into()),
                Ok(Record::Header(_)) => warn!(line = n + 2, "Skipping stray header record"),
                Err(e) => warn!(line = n + 2, error = %e, "Skipping corrupted index entry"),
            }
        }

        if entries.len() != manifest.chunk_count {
            warn!(
                expected = manifest.chunk_count,
                found = entries.len(),
                "Collection entry count differs from manifest"
            );
        }

        Ok((manifest, entries))
    }
}

fn write_records(path: &Path, manifest: &CollectionManifest, entries: &[IndexEntry]) -> Result<(), IndexError> {
    let storage = |e: std::io::Error| IndexError::Storage(format!("Failed to write {}: {e}", path.display()));

    let file = File::create(path).map_err(storage)?;
    let mut out = BufWriter::new(file);

    let header = serde_json::to_string(&Record::Header(manifest.clone()))
        .map_err(|e| IndexError::Storage(e.to_string()))?;
    writeln!(out, "{header}").map_err(storage)?;

    for entry in entries {
        let line = serde_json::to_string(&Record::Entry(entry.into()))
            .map_err(|e| IndexError::Storage(e.to_string()))?;
        writeln!(out, "{line}").map_err(storage)?;
    }

    out.flush().map_err(storage)?;
    out.get_ref().sync_all().map_err(storage)?;
    Ok(())
}
