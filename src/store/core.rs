// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Ordered chunk records, positionally aligned 1:1 with the flat index.

use crate::core::types::{Chunk, ChunkRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Position {position} out of range for store of length {len}")]
    OutOfRange { position: usize, len: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt chunk store: {0}")]
    Corrupt(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkStoreData {
    version: u32,
    records: Vec<ChunkRecord>,
}

/// Append-only sequence of chunk records. Positions are assigned
/// contiguously at append time and are never reused or reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkStore {
    records: Vec<ChunkRecord>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends records and returns the positions they were assigned.
    pub fn append(&mut self, records: Vec<ChunkRecord>) -> Vec<usize> {
        let start = self.records.len();
        let positions = (start..start + records.len()).collect();
        self.records.extend(records);
        positions
    }

    pub fn get(&self, position: usize) -> Result<Chunk, StoreError> {
        self.records
            .get(position)
            .map(|record| Chunk {
                text: record.text.clone(),
                source: record.source.clone(),
                category: record.category,
                position,
            })
            .ok_or(StoreError::OutOfRange {
                position,
                len: self.records.len(),
            })
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, StoreError> {
        let payload = ChunkStoreData {
            version: FORMAT_VERSION,
            records: self.records.clone(),
        };
        serde_cbor::to_vec(&payload).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Reconstructs a store, validating each record. Records with missing
    /// fields fail CBOR decoding; blank text is rejected explicitly.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, StoreError> {
        let payload: ChunkStoreData =
            serde_cbor::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if payload.version != FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "incompatible store version: found {}, expected {}",
                payload.version, FORMAT_VERSION
            )));
        }
        for (position, record) in payload.records.iter().enumerate() {
            if record.text.trim().is_empty() {
                return Err(StoreError::Corrupt(format!(
                    "record {} has empty text",
                    position
                )));
            }
        }

        Ok(Self {
            records: payload.records,
        })
    }
}
