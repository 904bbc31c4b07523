//! Transaction categorization engine
//!
//! Rules are always consulted first and a rule hit is final: it carries full
//! confidence, skips the LLM entirely, and never lands in the review queue.
//! Only unmatched transactions fall through to the LLM, whose suggestions are
//! gated by a confidence threshold. When the LLM is disabled or failing the
//! transaction is left uncategorized and flagged for review; a categorization
//! run must never die because a local model is down.
//!
//! LLM results are cached per-run so repeated merchants within one batch cost
//! a single call.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::ai::{AiBackend, AiClient};
use crate::db::Database;
use crate::error::Result;
use crate::matcher::RuleMatcher;
use crate::models::{BatchOutcome, CategorizationResult, Rule, TagSource, Taxonomy, Transaction};

/// Suggestions below this confidence are queued for review unless overridden
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.90;

/// Categorization engine over a loaded rule set, with optional LLM fallback
pub struct Categorizer<'a> {
    matcher: RuleMatcher,
    taxonomy: Taxonomy,
    ai: Option<&'a AiClient>,
    review_threshold: f64,
    /// Per-run cache for LLM outcomes ((merchant, detail) -> result)
    ai_cache: Mutex<HashMap<(String, Option<String>), CategorizationResult>>,
}

impl<'a> Categorizer<'a> {
    /// Create a categorizer from an already-loaded rule set and taxonomy
    pub fn new(
        rules: Vec<Rule>,
        taxonomy: Taxonomy,
        ai: Option<&'a AiClient>,
        review_threshold: f64,
    ) -> Self {
        Self {
            matcher: RuleMatcher::new(rules),
            taxonomy,
            ai,
            review_threshold,
            ai_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load the active rule set and taxonomy from the database
    pub fn for_database(
        db: &Database,
        ai: Option<&'a AiClient>,
        review_threshold: f64,
    ) -> Result<Self> {
        let rules = db.load_active_rules()?;
        let taxonomy = db.load_taxonomy()?;
        Ok(Self::new(rules, taxonomy, ai, review_threshold))
    }

    pub fn rule_count(&self) -> usize {
        self.matcher.len()
    }

    /// Categorize one transaction. Infallible: any failure along the way
    /// degrades to an unresolved result flagged for review.
    pub async fn categorize(&self, tx: &Transaction) -> CategorizationResult {
        // 1. Rules win outright
        if let Some(rule) = self
            .matcher
            .match_transaction(&tx.merchant, tx.detail.as_deref())
        {
            debug!(
                "Rule {} matched '{}': {}",
                rule.id, tx.merchant, rule.category
            );
            return CategorizationResult::from_rule(rule);
        }

        // 2. LLM fallback for the rest
        let ai = match self.ai {
            Some(ai) => ai,
            None => {
                debug!("No rule matched '{}' and LLM is disabled", tx.merchant);
                return CategorizationResult::unresolved();
            }
        };

        let cache_key = (tx.merchant.clone(), tx.detail.clone());
        {
            let cache = self.ai_cache.lock().unwrap();
            if let Some(cached) = cache.get(&cache_key) {
                debug!("LLM cache hit for '{}'", tx.merchant);
                return cached.clone();
            }
        }

        let result = match ai
            .suggest_category(
                &tx.description,
                &tx.merchant,
                tx.detail.as_deref(),
                &self.taxonomy,
            )
            .await
        {
            Ok(suggestion) => self.accept_suggestion(&tx.merchant, suggestion),
            Err(e) => {
                warn!("LLM suggestion failed for '{}': {}", tx.merchant, e);
                CategorizationResult::unresolved()
            }
        };

        self.ai_cache
            .lock()
            .unwrap()
            .insert(cache_key, result.clone());

        result
    }

    /// Turn a raw LLM suggestion into a result, enforcing the taxonomy and
    /// the review threshold. A category the taxonomy does not know is a
    /// failed suggestion; an unknown subcategory is dropped but the category
    /// kept.
    fn accept_suggestion(
        &self,
        merchant: &str,
        suggestion: crate::ai::CategorySuggestion,
    ) -> CategorizationResult {
        if self.taxonomy.validate(&suggestion.category, None).is_err() {
            warn!(
                "LLM suggested unknown category '{}' for '{}'",
                suggestion.category, merchant
            );
            return CategorizationResult::unresolved();
        }

        let subcategory = match &suggestion.subcategory {
            Some(sub) => {
                if self
                    .taxonomy
                    .validate(&suggestion.category, Some(sub))
                    .is_ok()
                {
                    Some(sub.clone())
                } else {
                    warn!(
                        "LLM suggested unknown subcategory '{}/{}' for '{}'; keeping category only",
                        suggestion.category, sub, merchant
                    );
                    None
                }
            }
            None => None,
        };

        let needs_review = suggestion.confidence < self.review_threshold;
        debug!(
            "LLM suggested {}/{:?} for '{}' (confidence {:.2}, review: {})",
            suggestion.category, subcategory, merchant, suggestion.confidence, needs_review
        );

        CategorizationResult {
            category: Some(suggestion.category),
            subcategory,
            tag_source: Some(TagSource::Llm),
            tag_confidence: suggestion.confidence,
            needs_review,
            matched_rule_id: None,
            rationale: suggestion.rationale,
        }
    }

    /// Categorize every uncategorized transaction and persist the outcomes.
    /// Each transaction is handled independently; one bad transaction never
    /// aborts the batch.
    pub async fn categorize_batch(
        &self,
        db: &Database,
        limit: Option<i64>,
    ) -> Result<BatchOutcome> {
        let pending = db.list_uncategorized(limit)?;
        let mut outcome = BatchOutcome::default();

        for tx in &pending {
            let result = self.categorize(tx).await;
            db.apply_categorization(tx.id, &result)?;
            outcome.record(&result);
        }

        Ok(outcome)
    }
}
