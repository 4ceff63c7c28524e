// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! The embedding model as an external collaborator.
//!
//! The core treats the model as a pure batched function with a declared
//! dimension; for a fixed model version the output is deterministic.

pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

pub use remote::{RemoteEmbedder, RemoteEmbedderConfig};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding service error: {0}")]
    Service(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimension of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Encodes a batch of texts, one vector per input, in input order.
    async fn encode(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}
