// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! The request-serving service object.
//!
//! Constructed once at startup from the loaded store and its collaborators,
//! then shared by reference with every request handler. There is no other
//! process-wide state.

use crate::core::types::{Category, ScoredChunk};
use crate::embedding::Embedder;
use crate::index::FlatIndex;
use crate::llm::{AnswerGenerator, Classification, GenerationError, QueryClassifier};
use crate::retrieval::Retriever;
use crate::store::ChunkStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Classifier hints below this confidence are ignored.
pub const CONFIDENCE_FLOOR: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub answer: Option<String>,
    pub chunks: Vec<ScoredChunk>,
    pub category: Option<Category>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthStatus {
    pub store_loaded: bool,
    pub chunks: usize,
}

pub struct RagService {
    index: Arc<FlatIndex>,
    store: Arc<ChunkStore>,
    retriever: Retriever,
    generator: Option<Arc<dyn AnswerGenerator>>,
    classifier: Option<Arc<dyn QueryClassifier>>,
}

impl RagService {
    pub fn new(
        index: Arc<FlatIndex>,
        store: Arc<ChunkStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let retriever = Retriever::new(index.clone(), store.clone(), embedder);
        Self {
            index,
            store,
            retriever,
            generator: None,
            classifier: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn QueryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn classifier_available(&self) -> bool {
        self.classifier.is_some()
    }

    /// Full query path: route to a category, retrieve, generate.
    ///
    /// Absence of retrievable context is not a failure; the generator is
    /// still asked and may answer from general knowledge. Collaborator
    /// failures land in the `error` field instead of propagating.
    pub async fn query(&self, text: &str, top_k: usize) -> QueryOutcome {
        let category = self.route(text).await;
        let retrieval = self.retriever.retrieve(text, top_k, category).await;
        let mut error = retrieval.error;

        let answer = match &self.generator {
            Some(generator) => match generator.generate(text, &retrieval.chunks).await {
                Ok(answer) => Some(answer),
                Err(e) => {
                    error!(error = %e, "answer generation failed");
                    let message = format!("answer generation failed: {}", e);
                    error = Some(match error {
                        Some(prev) => format!("{}; {}", prev, message),
                        None => message,
                    });
                    None
                }
            },
            None => None,
        };

        QueryOutcome {
            answer,
            chunks: retrieval.chunks,
            category,
            error,
        }
    }

    pub async fn classify(&self, text: &str) -> Result<Classification, GenerationError> {
        match &self.classifier {
            Some(classifier) => classifier.classify(text).await,
            None => Err(GenerationError::Service(
                "no classifier configured".to_string(),
            )),
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            store_loaded: !self.store.is_empty() && self.index.len() == self.store.len(),
            chunks: self.store.len(),
        }
    }

    /// Classifier-driven category routing. Low confidence or a classifier
    /// failure drops the hint; retrieval then runs unfiltered.
    async fn route(&self, text: &str) -> Option<Category> {
        let classifier = self.classifier.as_ref()?;
        match classifier.classify(text).await {
            Ok(classification) if classification.confidence >= CONFIDENCE_FLOOR => {
                info!(
                    category = %classification.category,
                    confidence = classification.confidence,
                    "routing query to category"
                );
                Some(classification.category)
            }
            Ok(classification) => {
                info!(
                    category = %classification.category,
                    confidence = classification.confidence,
                    "classification below confidence floor, retrieving unfiltered"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "classification failed, retrieving unfiltered");
                None
            }
        }
    }
}
