//! Ollama backend implementation
//!
//! HTTP client for the Ollama generate API. The categorization prompt embeds
//! the current taxonomy so the model can only answer in terms the database
//! will accept; every request carries a hard timeout so a wedged local model
//! degrades a run instead of hanging it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Taxonomy;

use super::parsing::parse_suggestion;
use super::types::CategorySuggestion;
use super::AiBackend;

/// Upper bound for one generate call; local models can be slow but a run
/// must never block on a single transaction.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create a new instance with a different model
    ///
    /// Used for runtime model override (e.g., `--model` on the command line)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

fn suggestion_prompt(
    description: &str,
    merchant: &str,
    detail: Option<&str>,
    taxonomy: &Taxonomy,
) -> String {
    let detail_line = match detail {
        Some(d) => format!("\nCounterparty detail: {}", d),
        None => String::new(),
    };

    format!(
        "You categorize personal bank transactions.\n\
         \n\
         Transaction:\n\
         Description: {description}\n\
         Merchant: {merchant}{detail_line}\n\
         \n\
         Choose the best fit from these categories and subcategories, nothing else:\n\
         {listing}\n\
         \n\
         Respond with ONLY a JSON object:\n\
         {{\"category\": \"<category>\", \"subcategory\": \"<subcategory or null>\", \
         \"confidence\": <0.0-1.0>, \"rationale\": \"<one short sentence>\"}}",
        description = description,
        merchant = merchant,
        detail_line = detail_line,
        listing = taxonomy.prompt_listing(),
    )
}

#[async_trait]
impl AiBackend for OllamaBackend {
    async fn suggest_category(
        &self,
        description: &str,
        merchant: &str,
        detail: Option<&str>,
        taxonomy: &Taxonomy,
    ) -> Result<CategorySuggestion> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: suggestion_prompt(description, merchant, detail, taxonomy),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http(response.error_for_status().unwrap_err()));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        debug!("Ollama response: {}", ollama_response.response);

        parse_suggestion(&ollama_response.response)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaxonomyCategory;

    fn small_taxonomy() -> Taxonomy {
        Taxonomy::new(vec![
            TaxonomyCategory {
                name: "Food & Drink".to_string(),
                display_order: 0,
                is_income: false,
                is_transfer: false,
                subcategories: vec!["Coffee".to_string(), "Restaurants".to_string()],
            },
            TaxonomyCategory {
                name: "Other".to_string(),
                display_order: 1,
                is_income: false,
                is_transfer: false,
                subcategories: vec![],
            },
        ])
    }

    #[test]
    fn test_prompt_embeds_taxonomy_and_transaction() {
        let prompt = suggestion_prompt(
            "SQ *BREADS BAKERY gosq.com",
            "SQ",
            Some("BREADS BAKERY"),
            &small_taxonomy(),
        );

        assert!(prompt.contains("Description: SQ *BREADS BAKERY gosq.com"));
        assert!(prompt.contains("Merchant: SQ"));
        assert!(prompt.contains("Counterparty detail: BREADS BAKERY"));
        assert!(prompt.contains("Food & Drink: Coffee, Restaurants"));
        assert!(prompt.contains("\"category\""));
    }

    #[test]
    fn test_prompt_skips_absent_detail() {
        let prompt = suggestion_prompt("BLUE BOTTLE COFFEE", "BLUE BOTTLE", None, &small_taxonomy());
        assert!(!prompt.contains("Counterparty detail"));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.model(), "llama3.2");
    }
}
