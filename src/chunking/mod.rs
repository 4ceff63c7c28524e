// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Text chunking strategies for corpus builds.
//!
//! Two strategies coexist because both were used historically: fixed-size
//! sliding windows with overlap, and a simpler paragraph split. The build
//! pipeline declares which one it uses via [`ChunkingConfig`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chunks shorter than this contribute nothing to the corpus.
pub const MIN_CHUNK_CHARS: usize = 100;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChunkingError {
    #[error("Invalid chunking config: {0}")]
    InvalidConfig(String),
}

/// The capability a build pipeline needs: text in, ordered chunks out.
pub trait ChunkStrategy: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Overlapping fixed-size windows, counted in Unicode scalars.
///
/// The window start advances by `size - overlap` each step. A trailing
/// window shorter than [`MIN_CHUNK_CHARS`] is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingWindowChunker {
    size: usize,
    overlap: usize,
}

impl SlidingWindowChunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= size {
            // A zero or negative stride would loop forever.
            return Err(ChunkingError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl ChunkStrategy for SlidingWindowChunker {
    fn split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        let chars: Vec<char> = trimmed.chars().collect();
        if chars.len() < MIN_CHUNK_CHARS {
            return Vec::new();
        }
        if chars.len() <= self.size {
            return vec![trimmed.to_string()];
        }

        let stride = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.size).min(chars.len());
            if end - start >= MIN_CHUNK_CHARS {
                chunks.push(chars[start..end].iter().collect());
            }
            start += stride;
        }
        chunks
    }
}

/// Splits on blank lines and keeps whatever survives a trim.
///
/// The earlier build variant used this for hand-written notes where
/// paragraphs are natural retrieval units; it applies no minimum length.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphChunker;

impl ChunkStrategy for ParagraphChunker {
    fn split(&self, text: &str) -> Vec<String> {
        text.split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Declares which strategy a build uses, with the legacy defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ChunkingConfig {
    SlidingWindow { size: usize, overlap: usize },
    Paragraph,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig::SlidingWindow {
            size: 1000,
            overlap: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn strategy(&self) -> Result<Box<dyn ChunkStrategy>, ChunkingError> {
        match *self {
            ChunkingConfig::SlidingWindow { size, overlap } => {
                Ok(Box::new(SlidingWindowChunker::new(size, overlap)?))
            }
            ChunkingConfig::Paragraph => Ok(Box::new(ParagraphChunker)),
        }
    }
}
