// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::core::types::{Category, ScoredChunk};
use crate::llm::{context_block, AnswerGenerator, Classification, GenerationError, QueryClassifier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RemoteLlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for RemoteLlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

fn build_client(config: &RemoteLlmConfig) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| GenerationError::Service(e.to_string()))
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    query: &'a str,
    context: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: Option<String>,
    #[serde(default)]
    blocked: Option<String>,
}

/// Answer generator backed by an LLM gateway over HTTP.
pub struct RemoteGenerator {
    client: reqwest::Client,
    config: RemoteLlmConfig,
}

impl RemoteGenerator {
    pub fn new(config: RemoteLlmConfig) -> Result<Self, GenerationError> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl AnswerGenerator for RemoteGenerator {
    async fn generate(
        &self,
        query: &str,
        context: &[ScoredChunk],
    ) -> Result<String, GenerationError> {
        let url = format!("{}/generate", self.config.base_url.trim_end_matches('/'));
        let request = GenerateRequest {
            model: &self.config.model,
            query,
            context: context_block(context),
        };

        debug!(model = %self.config.model, context_chunks = context.len(), "generating answer");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GenerationError::Service(format!(
                "generation server returned {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        if let Some(reason) = parsed.blocked {
            return Err(GenerationError::Blocked(reason));
        }
        parsed
            .text
            .ok_or_else(|| GenerationError::Service("generation response had no text".to_string()))
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    query: &'a str,
    categories: Vec<&'static str>,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    category: String,
    confidence: f32,
}

/// Query classifier backed by the same LLM gateway.
pub struct RemoteClassifier {
    client: reqwest::Client,
    config: RemoteLlmConfig,
}

impl RemoteClassifier {
    pub fn new(config: RemoteLlmConfig) -> Result<Self, GenerationError> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl QueryClassifier for RemoteClassifier {
    async fn classify(&self, query: &str) -> Result<Classification, GenerationError> {
        let url = format!("{}/classify", self.config.base_url.trim_end_matches('/'));
        let request = ClassifyRequest {
            model: &self.config.model,
            query,
            categories: Category::ALL.iter().map(|c| c.as_str()).collect(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GenerationError::Service(format!(
                "classification server returned {}",
                response.status()
            )));
        }

        let parsed: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        let category = Category::parse(&parsed.category)
            .map_err(|e| GenerationError::Service(e.to_string()))?;
        Ok(Classification {
            category,
            confidence: parsed.confidence.clamp(0.0, 1.0),
        })
    }
}
