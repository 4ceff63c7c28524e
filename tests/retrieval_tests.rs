// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

mod common;

use bioweave_rag::core::types::{Category, ChunkRecord};
use bioweave_rag::index::FlatIndex;
use bioweave_rag::retrieval::Retriever;
use bioweave_rag::store::ChunkStore;
use common::{AlwaysFailEmbedder, HashEmbedder, TEST_DIM};
use std::sync::Arc;

fn corpus(entries: &[(&str, Option<Category>)]) -> (Arc<FlatIndex>, Arc<ChunkStore>, Arc<HashEmbedder>) {
    let embedder = Arc::new(HashEmbedder::default());
    let mut index = FlatIndex::with_dimension(TEST_DIM);
    let mut store = ChunkStore::new();

    let vectors: Vec<Vec<f32>> = entries
        .iter()
        .map(|(text, _)| embedder.embed_one(text))
        .collect();
    index.add(&vectors).unwrap();
    store.append(
        entries
            .iter()
            .map(|(text, category)| ChunkRecord {
                text: text.to_string(),
                source: "test.txt".to_string(),
                category: *category,
            })
            .collect(),
    );
    (Arc::new(index), Arc::new(store), embedder)
}

/// Ten cardio chunks that share one query token and two movement chunks
/// that share two, so the movement chunks rank first unfiltered.
fn mixed_corpus() -> (Arc<FlatIndex>, Arc<ChunkStore>, Arc<HashEmbedder>) {
    let mut entries: Vec<(String, Option<Category>)> = (0..10)
        .map(|i| {
            (
                format!("heart recovery note number{}", i),
                Some(Category::Cardiovascular),
            )
        })
        .collect();
    entries.push((
        "running pace drills".to_string(),
        Some(Category::Movement),
    ));
    entries.push((
        "running pace ladders".to_string(),
        Some(Category::Movement),
    ));

    let borrowed: Vec<(&str, Option<Category>)> = entries
        .iter()
        .map(|(text, category)| (text.as_str(), *category))
        .collect();
    corpus(&borrowed)
}

const QUERY: &str = "running pace heart";

mod filter_tests {
    use super::*;

    #[tokio::test]
    async fn test_unfiltered_ranking_prefers_closest_chunks() {
        let (index, store, embedder) = mixed_corpus();
        let retriever = Retriever::new(index, store, embedder);

        let outcome = retriever.retrieve(QUERY, 2, None).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.chunks.len(), 2);
        for hit in &outcome.chunks {
            assert_eq!(hit.chunk.category, Some(Category::Movement));
        }
        assert!(outcome.chunks[0].score <= outcome.chunks[1].score);
    }

    #[tokio::test]
    async fn test_category_hint_filters_to_matching_chunks() {
        let (index, store, embedder) = mixed_corpus();
        let retriever = Retriever::new(index, store, embedder);

        let outcome = retriever
            .retrieve(QUERY, 5, Some(Category::Cardiovascular))
            .await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.chunks.len(), 5);
        for hit in &outcome.chunks {
            assert_eq!(hit.chunk.category, Some(Category::Cardiovascular));
        }
        for pair in outcome.chunks.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_short_category_backfilled_with_best_remaining() {
        let (index, store, embedder) = mixed_corpus();
        let retriever = Retriever::new(index, store, embedder);

        let outcome = retriever
            .retrieve(QUERY, 5, Some(Category::Movement))
            .await;
        assert_eq!(outcome.chunks.len(), 5);
        assert_eq!(outcome.chunks[0].chunk.category, Some(Category::Movement));
        assert_eq!(outcome.chunks[1].chunk.category, Some(Category::Movement));
        for hit in &outcome.chunks[2..] {
            assert_eq!(hit.chunk.category, Some(Category::Cardiovascular));
        }
    }

    #[tokio::test]
    async fn test_hint_without_matching_chunks_falls_back_to_plain_top_k() {
        let (index, store, embedder) = mixed_corpus();
        let retriever = Retriever::new(index, store, embedder);

        let outcome = retriever
            .retrieve(QUERY, 3, Some(Category::Nutrition))
            .await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.chunks.len(), 3);
        // Falls back to the unfiltered ranking, movement chunks first.
        assert_eq!(outcome.chunks[0].chunk.category, Some(Category::Movement));
    }
}

mod edge_case_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_index_yields_empty_outcome() {
        let embedder = Arc::new(HashEmbedder::default());
        let retriever = Retriever::new(
            Arc::new(FlatIndex::with_dimension(TEST_DIM)),
            Arc::new(ChunkStore::new()),
            embedder,
        );

        let outcome = retriever.retrieve(QUERY, 5, None).await;
        assert!(outcome.chunks.is_empty());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_zero_k_yields_empty_outcome() {
        let (index, store, embedder) = mixed_corpus();
        let retriever = Retriever::new(index, store, embedder);

        let outcome = retriever.retrieve(QUERY, 0, None).await;
        assert!(outcome.chunks.is_empty());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_embedder_failure_surfaces_as_error_field() {
        let (index, store, _) = mixed_corpus();
        let retriever = Retriever::new(index, store, Arc::new(AlwaysFailEmbedder::new(TEST_DIM)));

        let outcome = retriever.retrieve(QUERY, 5, None).await;
        assert!(outcome.chunks.is_empty());
        let message = outcome.error.expect("failure must be reported");
        assert!(message.contains("embedding failed"));
    }

    #[tokio::test]
    async fn test_unresolvable_positions_are_dropped() {
        // An index that claims one more vector than the store has chunks.
        let embedder = Arc::new(HashEmbedder::default());
        let mut index = FlatIndex::with_dimension(TEST_DIM);
        index.add(&[
            embedder.embed_one("alpha"),
            embedder.embed_one("beta"),
            embedder.embed_one("gamma"),
        ])
        .unwrap();

        let mut store = ChunkStore::new();
        store.append(vec![
            ChunkRecord {
                text: "alpha".to_string(),
                source: "a.txt".to_string(),
                category: None,
            },
            ChunkRecord {
                text: "beta".to_string(),
                source: "b.txt".to_string(),
                category: None,
            },
        ]);

        let retriever = Retriever::new(Arc::new(index), Arc::new(store), embedder);
        let outcome = retriever.retrieve("alpha beta gamma", 3, None).await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.chunks.len(), 2);
        for hit in &outcome.chunks {
            assert!(hit.chunk.position < 2);
        }
    }
}
