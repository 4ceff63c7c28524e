// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of topical buckets documents are filed under.
///
/// Categories are assigned at build time from the folder a document came
/// from and reused at query time by the classifier, so both sides share one
/// enumeration. Serde round-trips through the original folder labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Cardiovascular,
    #[serde(rename = "General Vitals & Body Composition")]
    GeneralVitals,
    Movement,
    Nutrition,
    Respiratory,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Unknown category: {0}")]
pub struct CategoryParseError(pub String);

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Cardiovascular,
        Category::GeneralVitals,
        Category::Movement,
        Category::Nutrition,
        Category::Respiratory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cardiovascular => "Cardiovascular",
            Category::GeneralVitals => "General Vitals & Body Composition",
            Category::Movement => "Movement",
            Category::Nutrition => "Nutrition",
            Category::Respiratory => "Respiratory",
        }
    }

    /// Parses a folder label or API string, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, CategoryParseError> {
        let normalized = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .find(|c| c.as_str().to_lowercase() == normalized)
            .copied()
            .ok_or_else(|| CategoryParseError(s.to_string()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk record as it is stored: everything but the position, which is
/// implied by the record's offset in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub source: String,
    pub category: Option<Category>,
}

/// A chunk resolved out of the store. Immutable once created; `position` is
/// the store offset at insertion time and is never reused or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub category: Option<Category>,
    pub position: usize,
}

/// A retrieval hit. `score` is the raw squared Euclidean distance to the
/// query vector: lower is more similar, and it is not normalized to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        ScoredChunk { chunk, score }
    }
}

impl PartialOrd for ScoredChunk {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredChunk {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(self.chunk.position.cmp(&other.chunk.position))
    }
}

impl Eq for ScoredChunk {}
