// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Durable persistence for the (index, chunk store) pair.
//!
//! The two files form one logical generation: the builder writes them
//! together and the serving process reads them together. Each file is
//! written to a temporary sibling and renamed into place so a concurrent
//! reader never observes a half-written file.

use crate::index::FlatIndex;
use crate::store::core::ChunkStore;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

pub const INDEX_FILE: &str = "flat_index.cbor";
pub const CHUNKS_FILE: &str = "chunks.cbor";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt store: {0}")]
    Corrupt(String),
}

pub struct StorePersister {
    dir: PathBuf,
}

impl StorePersister {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    /// Persists both structures, replacing the previous generation.
    /// Refuses to write a pair whose lengths disagree.
    pub async fn save(
        &self,
        index: &FlatIndex,
        store: &ChunkStore,
    ) -> Result<(), PersistenceError> {
        if index.len() != store.len() {
            return Err(PersistenceError::Corrupt(format!(
                "refusing to persist: index holds {} vectors but store holds {} chunks",
                index.len(),
                store.len()
            )));
        }

        fs::create_dir_all(&self.dir).await?;

        let index_bytes = index
            .to_cbor()
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        let chunk_bytes = store
            .to_cbor()
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        self.write_atomic(&self.index_path(), index_bytes).await?;
        self.write_atomic(&self.chunks_path(), chunk_bytes).await?;

        info!(
            dir = %self.dir.display(),
            vectors = index.len(),
            "persisted store generation"
        );
        Ok(())
    }

    /// Loads the persisted pair. `Ok(None)` means a fresh store (neither
    /// file exists); a half-missing pair, an unreadable file, or a length
    /// mismatch is corruption and must not be served from.
    pub async fn load(&self) -> Result<Option<(FlatIndex, ChunkStore)>, PersistenceError> {
        let index_path = self.index_path();
        let chunks_path = self.chunks_path();
        let have_index = fs::try_exists(&index_path).await?;
        let have_chunks = fs::try_exists(&chunks_path).await?;

        match (have_index, have_chunks) {
            (false, false) => Ok(None),
            (true, true) => {
                let index_bytes = fs::read(&index_path).await?;
                let chunk_bytes = fs::read(&chunks_path).await?;

                let index = FlatIndex::from_cbor(&index_bytes)
                    .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
                let store = ChunkStore::from_cbor(&chunk_bytes)
                    .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;

                if index.len() != store.len() {
                    return Err(PersistenceError::Corrupt(format!(
                        "index holds {} vectors but store holds {} chunks",
                        index.len(),
                        store.len()
                    )));
                }

                info!(
                    dir = %self.dir.display(),
                    vectors = index.len(),
                    "loaded store generation"
                );
                Ok(Some((index, store)))
            }
            _ => Err(PersistenceError::Corrupt(format!(
                "store files out of sync under {}: index present: {}, chunks present: {}",
                self.dir.display(),
                have_index,
                have_chunks
            ))),
        }
    }

    async fn write_atomic(&self, path: &Path, bytes: Vec<u8>) -> Result<(), PersistenceError> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "atomically replaced");
        Ok(())
    }
}
