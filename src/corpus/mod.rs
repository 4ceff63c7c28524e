// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Offline corpus building: documents in, persisted (index, store) pair out.
//!
//! Single-writer by convention: run at most one build at a time against a
//! store directory. Re-running a build over the same documents appends
//! duplicate chunks; the store is append-only and nothing deduplicates by
//! source path.

use crate::chunking::{ChunkingConfig, ChunkingError};
use crate::core::types::{Category, ChunkRecord};
use crate::embedding::Embedder;
use crate::index::{FlatIndex, IndexError};
use crate::store::{ChunkStore, PersistenceError, StorePersister};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// A document ready for ingestion. Text extraction happens upstream; the
/// category comes from where the document was filed, never from inference.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source: String,
    pub category: Option<Category>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub documents_seen: usize,
    pub documents_skipped: usize,
    pub chunks_added: usize,
    pub batches_failed: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub chunking: ChunkingConfig,
    pub batch_size: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Owns write access to the (index, store) pair for the duration of a build.
pub struct CorpusBuilder {
    index: FlatIndex,
    store: ChunkStore,
    embedder: Arc<dyn Embedder>,
    persister: StorePersister,
    config: BuilderConfig,
}

impl CorpusBuilder {
    /// Loads the persisted pair, or starts empty at the embedder's
    /// dimension. A corrupt pair is an error, not a silent fresh start.
    pub async fn open(
        persister: StorePersister,
        embedder: Arc<dyn Embedder>,
        config: BuilderConfig,
    ) -> Result<Self, BuildError> {
        let (index, store) = match persister.load().await? {
            Some(pair) => pair,
            None => {
                info!(
                    dir = %persister.dir().display(),
                    dimension = embedder.dimension(),
                    "no existing store, starting empty"
                );
                (FlatIndex::with_dimension(embedder.dimension()), ChunkStore::new())
            }
        };
        Ok(Self {
            index,
            store,
            embedder,
            persister,
            config,
        })
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Chunks, embeds, and appends a document set.
    ///
    /// Embedding runs in fixed-size batches to bound peak memory. A failed
    /// batch is skipped whole: neither its vectors nor its chunks are
    /// appended, so the index and store never drift apart. Nothing is
    /// persisted until [`CorpusBuilder::persist`] is called.
    pub async fn add_documents(&mut self, docs: &[SourceDocument]) -> Result<BuildReport, BuildError> {
        let strategy = self.config.chunking.strategy()?;
        let mut report = BuildReport::default();
        let mut pending: Vec<ChunkRecord> = Vec::new();

        for doc in docs {
            report.documents_seen += 1;
            let chunks = strategy.split(&doc.text);
            if chunks.is_empty() {
                warn!(source = %doc.source, "no chunks extracted, skipping");
                report.documents_skipped += 1;
                continue;
            }
            info!(source = %doc.source, chunks = chunks.len(), "chunked document");
            pending.extend(chunks.into_iter().map(|text| ChunkRecord {
                text,
                source: doc.source.clone(),
                category: doc.category,
            }));
        }

        if pending.is_empty() {
            report.total_chunks = self.store.len();
            return Ok(report);
        }

        let batch_size = self.config.batch_size.max(1);
        let mut staged_vectors: Vec<Vec<f32>> = Vec::new();
        let mut staged_records: Vec<ChunkRecord> = Vec::new();

        for (batch_id, batch) in pending.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
            match self.embedder.encode(&texts).await {
                Ok(vectors) if vectors.len() == batch.len() => {
                    staged_vectors.extend(vectors);
                    staged_records.extend_from_slice(batch);
                }
                Ok(vectors) => {
                    error!(
                        batch = batch_id,
                        expected = batch.len(),
                        got = vectors.len(),
                        "embedder returned wrong batch size, skipping batch"
                    );
                    report.batches_failed += 1;
                }
                Err(e) => {
                    error!(batch = batch_id, error = %e, "embedding batch failed, skipping batch");
                    report.batches_failed += 1;
                }
            }
        }

        // Single logical append. FlatIndex::add validates the whole batch
        // before writing, so an error here leaves both structures untouched.
        self.index.add(&staged_vectors)?;
        let positions = self.store.append(staged_records);
        debug_assert_eq!(self.index.len(), self.store.len());

        report.chunks_added = positions.len();
        report.total_chunks = self.store.len();
        info!(
            added = report.chunks_added,
            total = report.total_chunks,
            failed_batches = report.batches_failed,
            "document set ingested"
        );
        Ok(report)
    }

    /// Writes the current generation, replacing the previous one atomically.
    pub async fn persist(&self) -> Result<(), BuildError> {
        self.persister.save(&self.index, &self.store).await?;
        Ok(())
    }
}

/// Best-effort text extraction for plain-text files. Falls back to lossy
/// UTF-8 for legacy encodings and returns an empty string on unreadable
/// files; an empty result just means the document contributes nothing.
pub fn read_text_file(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read document");
            String::new()
        }
    }
}
