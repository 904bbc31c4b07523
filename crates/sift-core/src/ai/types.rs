//! AI backend response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use serde::{Deserialize, Serialize};

/// A category suggestion for one transaction
///
/// `confidence` is the model's self-reported certainty in 0.0-1.0; the
/// categorizer compares it against the review threshold. Parsing clamps
/// out-of-range values rather than rejecting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySuggestion {
    /// Category name, expected to come from the taxonomy listing in the prompt
    pub category: String,
    /// Optional subcategory under `category`
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Self-reported confidence (0.0-1.0); missing means 0.0
    #[serde(default)]
    pub confidence: f64,
    /// One-line explanation, kept for the review queue display
    #[serde(default)]
    pub rationale: Option<String>,
}
