// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Language-model collaborators: answer generation and query classification.
//!
//! Both are external services behind traits. Their failures surface as
//! user-visible error strings at the serving boundary, never as crashes.

pub mod remote;

use crate::core::types::{Category, ScoredChunk};
use async_trait::async_trait;
use thiserror::Error;

pub use remote::{RemoteClassifier, RemoteGenerator, RemoteLlmConfig};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Generation blocked: {0}")]
    Blocked(String),

    #[error("Generation service error: {0}")]
    Service(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produces an answer for `query` grounded in `context`. An empty
    /// context is allowed; the model may answer from general knowledge or
    /// state that it has insufficient information.
    async fn generate(
        &self,
        query: &str,
        context: &[ScoredChunk],
    ) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait QueryClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<Classification, GenerationError>;
}

/// Renders retrieved chunks into the numbered context block handed to the
/// generator.
pub fn context_block(context: &[ScoredChunk]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "DOCUMENT {} (Source: {}):\n{}",
                i + 1,
                hit.chunk.source,
                hit.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
