// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Append-only flat (exhaustive) nearest-neighbor index.
//!
//! Brute-force squared-L2 scan over row-major f32 vectors. At corpus scale
//! (thousands of chunks) exact linear search is the contract; there is no
//! update or delete, and positions are stable for the life of the store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot index an empty vector")]
    EmptyVector,

    #[error("k must be greater than zero")]
    InvalidK,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt index data: {0}")]
    Corrupt(String),
}

/// Durable byte layout: version, dimension, row count, row-major vectors.
#[derive(Debug, Serialize, Deserialize)]
struct FlatIndexData {
    version: u32,
    dimension: Option<usize>,
    count: usize,
    data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: Option<usize>,
    data: Vec<f32>,
    count: usize,
}

impl FlatIndex {
    /// An empty index whose dimension is inferred from the first batch.
    pub fn new() -> Self {
        Self {
            dimension: None,
            data: Vec::new(),
            count: 0,
        }
    }

    /// An empty index with the dimension fixed up front.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            data: Vec::new(),
            count: 0,
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends vectors in order. The whole batch is validated before any
    /// row is written, so a bad batch appends nothing.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        let mut dimension = self.dimension;
        for vector in vectors {
            match dimension {
                None => {
                    if vector.is_empty() {
                        return Err(IndexError::EmptyVector);
                    }
                    dimension = Some(vector.len());
                }
                Some(expected) => {
                    if vector.len() != expected {
                        return Err(IndexError::DimensionMismatch {
                            expected,
                            actual: vector.len(),
                        });
                    }
                }
            }
        }

        self.dimension = dimension;
        for vector in vectors {
            self.data.extend_from_slice(vector);
            self.count += 1;
        }
        Ok(())
    }

    /// k-nearest-neighbor scan by ascending squared Euclidean distance,
    /// ties broken by ascending position. Returns fewer than `k` results
    /// only when the index holds fewer than `k` vectors.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if self.count == 0 {
            return Ok(Vec::new());
        }
        if query.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(position, row)| (position, squared_distance(query, row)))
            .collect();
        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Borrow of row `position`, if it exists. Used by integrity checks.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let dimension = self.dimension?;
        if position >= self.count {
            return None;
        }
        Some(&self.data[position * dimension..(position + 1) * dimension])
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, IndexError> {
        let payload = FlatIndexData {
            version: FORMAT_VERSION,
            dimension: self.dimension,
            count: self.count,
            data: self.data.clone(),
        };
        serde_cbor::to_vec(&payload).map_err(|e| IndexError::Serialization(e.to_string()))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, IndexError> {
        let payload: FlatIndexData =
            serde_cbor::from_slice(bytes).map_err(|e| IndexError::Corrupt(e.to_string()))?;

        if payload.version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "incompatible index version: found {}, expected {}",
                payload.version, FORMAT_VERSION
            )));
        }
        match payload.dimension {
            Some(dimension) => {
                if dimension == 0 || payload.count * dimension != payload.data.len() {
                    return Err(IndexError::Corrupt(format!(
                        "row data does not match {} vectors of dimension {}",
                        payload.count, dimension
                    )));
                }
            }
            None => {
                if payload.count != 0 || !payload.data.is_empty() {
                    return Err(IndexError::Corrupt(
                        "vectors present without a declared dimension".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            dimension: payload.dimension,
            data: payload.data,
            count: payload.count,
        })
    }
}

impl Default for FlatIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
