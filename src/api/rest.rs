// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::service::RagService;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    pub timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_request_size: 1024 * 1024, // 1MB
            timeout: Duration::from_secs(30),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RagService>,
}

// Request/Response types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: Option<String>,
    pub retrieved_chunks: Vec<RetrievedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub category: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: StoreHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreHealth {
    pub loaded: bool,
    pub chunks: usize,
}

// Error handling
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip)]
    pub status_code: StatusCode,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        Self {
            error,
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(error: String) -> Self {
        Self {
            error,
            status_code: StatusCode::BAD_REQUEST,
        }
    }

    pub fn unavailable(error: String) -> Self {
        Self {
            error,
            status_code: StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

pub fn create_app(service: Arc<RagService>, config: &ApiConfig) -> Router {
    let state = AppState { service };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .route("/classify", post(classify_handler));

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(config.max_request_size))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.service.health();
    Json(HealthResponse {
        status: if health.store_loaded {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: StoreHealth {
            loaded: health.store_loaded,
            chunks: health.chunks,
        },
    })
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ErrorResponse> {
    if request.query.trim().is_empty() {
        return Err(ErrorResponse::bad_request("query must not be empty".to_string()));
    }
    if request.top_k == 0 {
        return Err(ErrorResponse::bad_request("top_k must be greater than zero".to_string()));
    }

    info!(top_k = request.top_k, "received query");
    let outcome = state.service.query(&request.query, request.top_k).await;

    let retrieved_chunks = outcome
        .chunks
        .into_iter()
        .map(|hit| RetrievedChunk {
            text: hit.chunk.text,
            source: hit.chunk.source,
            category: hit.chunk.category.map(|c| c.as_str().to_string()),
            score: hit.score,
        })
        .collect();

    Ok(Json(QueryResponse {
        answer: outcome.answer,
        retrieved_chunks,
        category: outcome.category.map(|c| c.as_str().to_string()),
        error: outcome.error,
    }))
}

async fn classify_handler(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ErrorResponse> {
    if !state.service.classifier_available() {
        return Err(ErrorResponse::unavailable(
            "no classifier configured".to_string(),
        ));
    }
    if request.query.trim().is_empty() {
        return Err(ErrorResponse::bad_request("query must not be empty".to_string()));
    }

    let classification = state
        .service
        .classify(&request.query)
        .await
        .map_err(|e| ErrorResponse::new(format!("classification failed: {}", e)))?;

    Ok(Json(ClassifyResponse {
        category: classification.category.as_str().to_string(),
        confidence: classification.confidence,
    }))
}
