//! JSON parsing helpers for AI backend responses
//!
//! These functions extract JSON from AI model responses, which often include
//! extra text before/after the JSON payload.

use crate::error::{Error, Result};

use super::types::CategorySuggestion;

/// Parse a category suggestion from an AI response
///
/// Tolerates prose and markdown fences around the JSON object. Confidence is
/// clamped into 0.0-1.0 (non-finite values become 0.0) and an empty-string
/// subcategory is treated as absent, since small models emit both routinely.
pub fn parse_suggestion(response: &str) -> Result<CategorySuggestion> {
    let response = response.trim();

    // Look for JSON object
    let start = response.find('{');
    let end = response.rfind('}');

    let mut suggestion: CategorySuggestion = match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                // Truncate long responses for the error message
                let truncated = if json_str.len() > 200 {
                    format!("{}...", &json_str[..200])
                } else {
                    json_str.to_string()
                };
                Error::InvalidData(format!("Invalid JSON from AI: {} | Raw: {}", e, truncated))
            })?
        }
        _ => {
            return Err(Error::InvalidData(format!(
                "No JSON found in AI response | Raw: {}",
                if response.len() > 200 {
                    format!("{}...", &response[..200])
                } else {
                    response.to_string()
                }
            )))
        }
    };

    if suggestion.category.trim().is_empty() {
        return Err(Error::InvalidData(
            "AI suggestion has an empty category".into(),
        ));
    }

    suggestion.confidence = if suggestion.confidence.is_finite() {
        suggestion.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    if suggestion
        .subcategory
        .as_deref()
        .is_some_and(|s| s.trim().is_empty())
    {
        suggestion.subcategory = None;
    }

    Ok(suggestion)
}
