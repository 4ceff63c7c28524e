// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{Context, Result};
use bioweave_rag::api::rest::{create_app, ApiConfig};
use bioweave_rag::embedding::{RemoteEmbedder, RemoteEmbedderConfig};
use bioweave_rag::index::FlatIndex;
use bioweave_rag::llm::{RemoteClassifier, RemoteGenerator, RemoteLlmConfig};
use bioweave_rag::service::RagService;
use bioweave_rag::store::{ChunkStore, StorePersister};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bioweave_rag=info,tower_http=debug".into()),
        )
        .init();

    let config = load_config();
    let store_dir =
        std::env::var("BIOWEAVE_STORE_DIR").unwrap_or_else(|_| "store".to_string());

    info!("Starting BioWeave RAG server on {}:{}", config.host, config.port);

    // Load the persisted store. A corrupt store is fatal: the service must
    // not serve from an inconsistent generation.
    let persister = StorePersister::new(&store_dir);
    let (index, store) = match persister.load().await {
        Ok(Some(pair)) => pair,
        Ok(None) => {
            warn!(dir = %store_dir, "no persisted store found, serving empty");
            (FlatIndex::new(), ChunkStore::new())
        }
        Err(e) => {
            error!(dir = %store_dir, error = %e, "store is corrupt, refusing to start");
            return Err(e).context("failed to load persisted store");
        }
    };

    let embedder = Arc::new(RemoteEmbedder::new(embedder_config())?);
    let mut service = RagService::new(Arc::new(index), Arc::new(store), embedder);

    if let Ok(base_url) = std::env::var("BIOWEAVE_LLM_URL") {
        let llm_config = llm_config(base_url);
        service = service
            .with_generator(Arc::new(RemoteGenerator::new(llm_config.clone())?))
            .with_classifier(Arc::new(RemoteClassifier::new(llm_config)?));
        info!("answer generation and query classification enabled");
    } else {
        warn!("BIOWEAVE_LLM_URL not set, serving retrieval-only responses");
    }

    let app = create_app(Arc::new(service), &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn load_config() -> ApiConfig {
    ApiConfig {
        host: std::env::var("BIOWEAVE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: std::env::var("BIOWEAVE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080),
        max_request_size: std::env::var("BIOWEAVE_MAX_REQUEST_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024 * 1024), // 1MB default
        timeout: std::time::Duration::from_secs(
            std::env::var("BIOWEAVE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        ),
        cors_origins: std::env::var("BIOWEAVE_CORS_ORIGINS")
            .ok()
            .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]),
    }
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

fn llm_config(base_url: String) -> RemoteLlmConfig {
    let defaults = RemoteLlmConfig::default();
    RemoteLlmConfig {
        base_url,
        model: std::env::var("BIOWEAVE_LLM_MODEL").unwrap_or(defaults.model),
        timeout: defaults.timeout,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
