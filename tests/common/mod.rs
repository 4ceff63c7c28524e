// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic fake collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bioweave_rag::core::types::{Category, ScoredChunk};
use bioweave_rag::embedding::{Embedder, EmbeddingError};
use bioweave_rag::llm::{AnswerGenerator, Classification, GenerationError, QueryClassifier};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const TEST_DIM: usize = 128;

/// Deterministic bag-of-words embedder: each token hashes into a bucket,
/// the result is L2-normalized. Texts sharing tokens land close together,
/// which is all the retrieval tests need from a model.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(TEST_DIM)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(batch.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Embeds normally except for one batch call, which fails. Calls are
/// counted from one.
pub struct FailNthBatchEmbedder {
    inner: HashEmbedder,
    fail_on: usize,
    calls: AtomicUsize,
}

impl FailNthBatchEmbedder {
    pub fn new(fail_on: usize) -> Self {
        Self {
            inner: HashEmbedder::default(),
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FailNthBatchEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn encode(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(EmbeddingError::ModelUnavailable(
                "simulated mid-build outage".to_string(),
            ));
        }
        self.inner.encode(batch).await
    }
}

pub struct AlwaysFailEmbedder {
    dimension: usize,
}

impl AlwaysFailEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for AlwaysFailEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, _batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::ModelUnavailable(
            "model is down".to_string(),
        ))
    }
}

pub struct StaticGenerator {
    pub answer: String,
}

impl StaticGenerator {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for StaticGenerator {
    async fn generate(
        &self,
        _query: &str,
        context: &[ScoredChunk],
    ) -> Result<String, GenerationError> {
        Ok(format!("{} [{} chunks consulted]", self.answer, context.len()))
    }
}

pub struct FailingGenerator;

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    async fn generate(
        &self,
        _query: &str,
        _context: &[ScoredChunk],
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Blocked("safety filter".to_string()))
    }
}

pub struct StaticClassifier {
    pub category: Category,
    pub confidence: f32,
}

impl StaticClassifier {
    pub fn new(category: Category, confidence: f32) -> Self {
        Self {
            category,
            confidence,
        }
    }
}

#[async_trait]
impl QueryClassifier for StaticClassifier {
    async fn classify(&self, _query: &str) -> Result<Classification, GenerationError> {
        Ok(Classification {
            category: self.category,
            confidence: self.confidence,
        })
    }
}
