//! Pluggable local AI backend abstraction
//!
//! This module provides a backend-agnostic interface for the LLM fallback.
//! All backends run locally (no cloud APIs).
//!
//! # Architecture
//!
//! - `AiBackend` trait: defines the interface for category suggestions
//! - `AiClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `SIFT_AI_BACKEND`: Backend to use (ollama, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;
pub mod parsing;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use types::CategorySuggestion;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Taxonomy;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Suggest a category for a transaction
    ///
    /// Given the raw description plus the normalized merchant/detail pair,
    /// return a taxonomy-valid suggestion or an error. Callers treat any
    /// error as "no suggestion".
    async fn suggest_category(
        &self,
        description: &str,
        merchant: &str,
        detail: Option<&str>,
        taxonomy: &Taxonomy,
    ) -> Result<CategorySuggestion>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for status output)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AiClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AiClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `SIFT_AI_BACKEND` to determine which backend to use:
    /// - `ollama` (default): Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("SIFT_AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AiClient::Ollama),
            "mock" => Some(AiClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown SIFT_AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AiClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AiClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AiClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AiClient::Ollama(b) => AiClient::Ollama(b.with_model(model)),
            AiClient::Mock(b) => AiClient::Mock(b.with_model(model)),
        }
    }
}

// Implement AiBackend for AiClient by delegating to the inner backend
#[async_trait]
impl AiBackend for AiClient {
    async fn suggest_category(
        &self,
        description: &str,
        merchant: &str,
        detail: Option<&str>,
        taxonomy: &Taxonomy,
    ) -> Result<CategorySuggestion> {
        match self {
            AiClient::Ollama(b) => {
                b.suggest_category(description, merchant, detail, taxonomy)
                    .await
            }
            AiClient::Mock(b) => {
                b.suggest_category(description, merchant, detail, taxonomy)
                    .await
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AiClient::Ollama(b) => b.health_check().await,
            AiClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AiClient::Ollama(b) => b.model(),
            AiClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AiClient::Ollama(b) => b.host(),
            AiClient::Mock(b) => b.host(),
        }
    }
}
