// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Offline corpus build. Walks a knowledge-base directory whose immediate
//! subdirectories are category labels, ingests every readable text file,
//! and persists the store. Run at most one build at a time per store
//! directory; there is no cross-process lock.

use anyhow::{bail, Context, Result};
use bioweave_rag::chunking::ChunkingConfig;
use bioweave_rag::core::types::Category;
use bioweave_rag::corpus::{read_text_file, BuilderConfig, CorpusBuilder, SourceDocument};
use bioweave_rag::embedding::{RemoteEmbedder, RemoteEmbedderConfig};
use bioweave_rag::store::StorePersister;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Files with less extracted text than this are not worth indexing.
const MIN_DOCUMENT_CHARS: usize = 50;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bioweave_rag=info,build=info".into()),
        )
        .init();

    let kb_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BIOWEAVE_KB_DIR").ok())
        .unwrap_or_else(|| "knowledge_base".to_string());
    let store_dir =
        std::env::var("BIOWEAVE_STORE_DIR").unwrap_or_else(|_| "store".to_string());

    if !Path::new(&kb_dir).is_dir() {
        bail!("knowledge base directory '{}' not found", kb_dir);
    }

    info!(kb_dir = %kb_dir, store_dir = %store_dir, "starting corpus build");

    let documents = collect_documents(Path::new(&kb_dir))?;
    if documents.is_empty() {
        warn!("no documents found, nothing to build");
        return Ok(());
    }
    info!(documents = documents.len(), "collected documents");

    let embedder = Arc::new(RemoteEmbedder::new(embedder_config())?);
    let persister = StorePersister::new(&store_dir);
    let mut builder = CorpusBuilder::open(persister, embedder, builder_config())
        .await
        .context("failed to open corpus store")?;

    let report = builder.add_documents(&documents).await?;
    builder.persist().await.context("failed to persist store")?;

    info!(
        documents = report.documents_seen,
        skipped = report.documents_skipped,
        chunks_added = report.chunks_added,
        failed_batches = report.batches_failed,
        total_chunks = report.total_chunks,
        "corpus build complete"
    );
    Ok(())
}

/// One directory level, like the original layout: files directly under the
/// root are uncategorized, files in a recognized category folder carry that
/// category, unrecognized folders are ingested uncategorized with a warning.
fn collect_documents(kb_dir: &Path) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();

    for entry in std::fs::read_dir(kb_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            push_document(&mut documents, &path, None);
        } else if path.is_dir() {
            let label = entry.file_name().to_string_lossy().into_owned();
            let category = match Category::parse(&label) {
                Ok(category) => Some(category),
                Err(_) => {
                    warn!(folder = %label, "not a known category, ingesting uncategorized");
                    None
                }
            };
            for file in std::fs::read_dir(&path)? {
                let file = file?;
                if file.path().is_file() {
                    push_document(&mut documents, &file.path(), category);
                }
            }
        }
    }
    Ok(documents)
}

fn push_document(documents: &mut Vec<SourceDocument>, path: &Path, category: Option<Category>) {
    let recognized = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    if !recognized {
        warn!(path = %path.display(), "unsupported file type, skipping");
        return;
    }

    let text = read_text_file(path);
    if text.trim().chars().count() < MIN_DOCUMENT_CHARS {
        warn!(path = %path.display(), "insufficient text content, skipping");
        return;
    }

    documents.push(SourceDocument {
        source: path.display().to_string(),
        category,
        text,
    });
}

fn embedder_config() -> RemoteEmbedderConfig {
    let defaults = RemoteEmbedderConfig::default();
    RemoteEmbedderConfig {
        base_url: std::env::var("BIOWEAVE_EMBED_URL").unwrap_or(defaults.base_url),
        model: std::env::var("BIOWEAVE_EMBED_MODEL").unwrap_or(defaults.model),
        dimension: std::env::var("BIOWEAVE_EMBED_DIM")
            .ok()
            .and_then(|d| d.parse().ok())
            .unwrap_or(defaults.dimension),
        timeout: defaults.timeout,
    }
}

fn builder_config() -> BuilderConfig {
    let defaults = BuilderConfig::default();
    let chunking = match std::env::var("BIOWEAVE_CHUNK_STRATEGY").as_deref() {
        Ok("paragraph") => ChunkingConfig::Paragraph,
        _ => ChunkingConfig::SlidingWindow {
            size: std::env::var("BIOWEAVE_CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            overlap: std::env::var("BIOWEAVE_CHUNK_OVERLAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
        },
    };
    BuilderConfig {
        chunking,
        batch_size: std::env::var("BIOWEAVE_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.batch_size),
    }
}
