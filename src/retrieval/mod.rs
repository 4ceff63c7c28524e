// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Online retrieval: embed the query, search the index, resolve chunks,
//! apply the category filter with backfill.
//!
//! The retriever only reads. Once the index and store are loaded they are
//! shared freely across concurrent requests without locking.

use crate::core::types::{Category, ScoredChunk};
use crate::embedding::Embedder;
use crate::index::FlatIndex;
use crate::store::ChunkStore;
use std::sync::Arc;
use tracing::{error, warn};

/// Over-fetch multiplier when a category hint is present, so filtering
/// usually still yields k in-category hits.
pub const CATEGORY_OVERFETCH: usize = 3;

/// Result of a retrieval attempt. A failure never propagates as an error;
/// it shows up as an empty chunk list plus a message, because one bad query
/// must not take down a shared serving process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalOutcome {
    pub chunks: Vec<ScoredChunk>,
    pub error: Option<String>,
}

impl RetrievalOutcome {
    fn empty() -> Self {
        Self::default()
    }

    fn failed(message: String) -> Self {
        Self {
            chunks: Vec::new(),
            error: Some(message),
        }
    }
}

pub struct Retriever {
    index: Arc<FlatIndex>,
    store: Arc<ChunkStore>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<FlatIndex>, store: Arc<ChunkStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            store,
            embedder,
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        category_hint: Option<Category>,
    ) -> RetrievalOutcome {
        if k == 0 || self.index.is_empty() {
            return RetrievalOutcome::empty();
        }

        let batch = [query.to_string()];
        let embedded = match self.embedder.encode(&batch).await {
            Ok(vectors) => vectors,
            Err(e) => {
                error!(error = %e, "query embedding failed");
                return RetrievalOutcome::failed(format!("query embedding failed: {}", e));
            }
        };
        let Some(query_vector) = embedded.into_iter().next() else {
            error!("embedder returned no vector for query");
            return RetrievalOutcome::failed("embedder returned no vector for query".to_string());
        };

        let fetch_k = if category_hint.is_some() {
            k.saturating_mul(CATEGORY_OVERFETCH)
        } else {
            k
        };
        let hits = match self.index.search(&query_vector, fetch_k) {
            Ok(hits) => hits,
            Err(e) => {
                error!(error = %e, "index search failed");
                return RetrievalOutcome::failed(format!("index search failed: {}", e));
            }
        };

        // Positions a corrupted index hands back that don't resolve are
        // dropped, not fatal; the query proceeds with fewer results.
        let mut resolved = Vec::with_capacity(hits.len());
        for (position, distance) in hits {
            match self.store.get(position) {
                Ok(chunk) => resolved.push(ScoredChunk::new(chunk, distance)),
                Err(e) => {
                    warn!(position, error = %e, "dropping hit with unresolvable position");
                }
            }
        }

        let chunks = match category_hint {
            None => {
                let mut chunks = resolved;
                chunks.truncate(k);
                chunks
            }
            Some(hint) => filter_with_backfill(resolved, hint, k),
        };

        RetrievalOutcome {
            chunks,
            error: None,
        }
    }
}

/// In-category hits first, rank order preserved, backfilled with the best
/// remaining hits up to `k`. Zero in-category hits falls back to the plain
/// top-k, so a category with no indexed chunks still gets answers.
fn filter_with_backfill(
    resolved: Vec<ScoredChunk>,
    hint: Category,
    k: usize,
) -> Vec<ScoredChunk> {
    let (mut matching, other): (Vec<_>, Vec<_>) = resolved
        .into_iter()
        .partition(|hit| hit.chunk.category == Some(hint));

    if matching.is_empty() {
        let mut chunks = other;
        chunks.truncate(k);
        return chunks;
    }

    matching.truncate(k);
    if matching.len() < k {
        matching.extend(other.into_iter().take(k - matching.len()));
    }
    matching
}
