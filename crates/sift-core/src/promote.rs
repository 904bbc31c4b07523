//! Rule promotion: turning confirmed manual decisions into persisted rules
//!
//! A review answer fixes one transaction; promotion makes it stick. The
//! promoted rule is composite (merchant + counterparty detail) whenever the
//! transaction carries a detail token, which is what makes processor
//! merchants like SQ and ZELLE learnable at all.

use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;
use crate::models::{MatchType, NewRule, PriorityTiers, PromotionOutcome, RulePack, Transaction};

/// Promotes manual categorization decisions into rules
pub struct Promoter<'a> {
    db: &'a Database,
    tiers: PriorityTiers,
}

impl<'a> Promoter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            tiers: PriorityTiers::default(),
        }
    }

    pub fn with_tiers(db: &'a Database, tiers: PriorityTiers) -> Self {
        Self { db, tiers }
    }

    /// Promote a transaction's corrected categorization into a rule and mark
    /// the transaction itself as manually categorized.
    ///
    /// The transaction is stamped `manual` whichever way the rule side goes:
    /// the user's explicit choice always wins for that one transaction, even
    /// when an equivalent rule already exists and `overwrite` is off.
    pub fn promote(
        &self,
        tx: &Transaction,
        category: &str,
        subcategory: Option<&str>,
        pack_hint: Option<RulePack>,
        overwrite: bool,
    ) -> Result<(PromotionOutcome, Transaction)> {
        let taxonomy = self.db.load_taxonomy()?;
        let new_rule = rule_from_transaction(tx, category, subcategory, pack_hint);

        let outcome = self
            .db
            .promote_rule(&new_rule, &taxonomy, &self.tiers, overwrite)?;
        match &outcome {
            PromotionOutcome::Created(rule) => {
                info!(
                    "Promoted '{}' to rule {} -> {}",
                    tx.merchant, rule.id, rule.category
                );
            }
            PromotionOutcome::Duplicate { existing } => {
                debug!(
                    "Promotion of '{}' matched existing rule {}; left untouched",
                    tx.merchant, existing.id
                );
            }
            PromotionOutcome::Retargeted(rule) => {
                info!("Promotion retargeted rule {} to {}", rule.id, rule.category);
            }
        }

        let updated = self.db.apply_review(tx.id, category, subcategory, &taxonomy)?;
        Ok((outcome, updated))
    }
}

/// Build the rule a transaction's decision should persist as.
///
/// A non-empty detail token makes the rule composite (exact match on both
/// merchant and detail); otherwise the rule matches the merchant alone. The
/// pack defaults to composite-learned, the home tier for review-driven rules.
fn rule_from_transaction(
    tx: &Transaction,
    category: &str,
    subcategory: Option<&str>,
    pack_hint: Option<RulePack>,
) -> NewRule {
    let detail = tx
        .detail
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    NewRule {
        pack: pack_hint.unwrap_or(RulePack::CompositeLearned),
        priority: None,
        match_type: MatchType::Exact,
        match_value: tx.merchant.clone(),
        match_detail: detail,
        category: category.to_string(),
        subcategory: subcategory.map(str::to_string),
        created_by: Some("review".to_string()),
        notes: None,
    }
}
