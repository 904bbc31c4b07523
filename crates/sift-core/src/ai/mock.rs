//! Mock backend for testing
//!
//! Provides deterministic suggestions for well-known merchants without a
//! running LLM server. Useful for unit tests and development.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Taxonomy;

use super::types::CategorySuggestion;
use super::AiBackend;

/// Mock AI backend for testing
///
/// Returns predictable responses keyed on merchant/detail keywords. An
/// unhealthy mock fails every suggestion, which is how tests exercise the
/// degraded path.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether the backend reports healthy and serves suggestions
    pub healthy: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }
}

#[async_trait]
impl AiBackend for MockBackend {
    async fn suggest_category(
        &self,
        description: &str,
        merchant: &str,
        detail: Option<&str>,
        _taxonomy: &Taxonomy,
    ) -> Result<CategorySuggestion> {
        if !self.healthy {
            return Err(Error::Ai("mock backend is unavailable".into()));
        }

        let haystack = match detail {
            Some(d) => format!("{} {} {}", description, merchant, d).to_uppercase(),
            None => format!("{} {}", description, merchant).to_uppercase(),
        };

        let (category, subcategory, confidence) = match haystack.as_str() {
            h if h.contains("BAKERY") || h.contains("COFFEE") || h.contains("CAFE") => {
                ("Food & Drink", Some("Coffee"), 0.95)
            }
            h if h.contains("SUSHI") || h.contains("RESTAURANT") => {
                ("Food & Drink", Some("Restaurants"), 0.72)
            }
            h if h.contains("WHOLEFDS") || h.contains("TRADER JOE") => {
                ("Groceries", Some("Supermarket"), 0.96)
            }
            h if h.contains("AMAZON") || h.contains("AMZN") => ("Shopping", Some("Amazon"), 0.97),
            h if h.contains("NETFLIX") || h.contains("SPOTIFY") => {
                ("Subscriptions", Some("Streaming"), 0.98)
            }
            h if h.contains("UBER") || h.contains("LYFT") => {
                ("Transport", Some("Rideshare"), 0.85)
            }
            h if h.contains("ZELLE") || h.contains("VENMO") => ("Transfers", None, 0.45),
            _ => ("Other", None, 0.30),
        };

        Ok(CategorySuggestion {
            category: category.to_string(),
            subcategory: subcategory.map(|s| s.to_string()),
            confidence,
            rationale: Some(format!("Mock suggestion for {}", merchant)),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> Taxonomy {
        Taxonomy::new(vec![])
    }

    #[tokio::test]
    async fn test_mock_suggest_category() {
        let mock = MockBackend::new();
        let result = mock
            .suggest_category("SQ *BREADS BAKERY", "SQ", Some("BREADS BAKERY"), &taxonomy())
            .await
            .unwrap();
        assert_eq!(result.category, "Food & Drink");
        assert_eq!(result.subcategory.as_deref(), Some("Coffee"));
        assert!(result.confidence > 0.9);
    }

    #[tokio::test]
    async fn test_mock_low_confidence_for_unknown() {
        let mock = MockBackend::new();
        let result = mock
            .suggest_category("SOME NEW SHOP", "SOME NEW SHOP", None, &taxonomy())
            .await
            .unwrap();
        assert_eq!(result.category, "Other");
        assert!(result.confidence < 0.5);
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let healthy = MockBackend::new();
        assert!(healthy.health_check().await);

        let unhealthy = MockBackend::unhealthy();
        assert!(!unhealthy.health_check().await);
    }

    #[tokio::test]
    async fn test_unhealthy_mock_fails_suggestions() {
        let mock = MockBackend::unhealthy();
        let result = mock
            .suggest_category("AMAZON.COM*ORDER", "AMAZON", None, &taxonomy())
            .await;
        assert!(result.is_err());
    }
}
