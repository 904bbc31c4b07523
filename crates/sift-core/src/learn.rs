//! Learned rules: mining confirmed history for stable merchant patterns
//!
//! Every manual decision and every confident LLM tag is a vote. When a
//! (merchant, detail) pair has voted often enough and consistently enough
//! for one target, the learner persists an exact-match rule so the LLM never
//! sees that merchant again. Rule-matched history is not mined; those
//! merchants already have a rule.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::models::{MatchType, NewRule, PriorityTiers, PromotionOutcome, RulePack};

pub const DEFAULT_MIN_OCCURRENCES: usize = 3;
pub const DEFAULT_MIN_CONSISTENCY: f64 = 0.90;

/// What a learning pass found and did
#[derive(Debug, Clone, Default)]
pub struct LearnReport {
    /// Groups that met the occurrence gate
    pub candidates: usize,
    /// New rules persisted
    pub created: usize,
    /// Candidates already covered by an equivalent active rule
    pub skipped_existing: usize,
    /// Candidates whose dominant target fell below the consistency gate
    pub below_consistency: usize,
}

/// Mines categorized history into learned-tier rules
pub struct PatternLearner<'a> {
    db: &'a Database,
    tiers: PriorityTiers,
    min_occurrences: usize,
    min_consistency: f64,
}

impl<'a> PatternLearner<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            tiers: PriorityTiers::default(),
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
            min_consistency: DEFAULT_MIN_CONSISTENCY,
        }
    }

    pub fn with_thresholds(mut self, min_occurrences: usize, min_consistency: f64) -> Self {
        self.min_occurrences = min_occurrences.max(1);
        self.min_consistency = min_consistency;
        self
    }

    /// Run one learning pass over the confirmed history
    pub fn learn(&self) -> Result<LearnReport> {
        let taxonomy = self.db.load_taxonomy()?;
        let history = self.db.categorized_history()?;

        let mut groups: HashMap<(String, Option<String>), Vec<(String, Option<String>)>> =
            HashMap::new();
        for (merchant, detail, category, subcategory) in history {
            groups
                .entry((merchant, detail))
                .or_default()
                .push((category, subcategory));
        }

        // Stable iteration order keeps created rule ids deterministic
        let mut keys: Vec<_> = groups.keys().cloned().collect();
        keys.sort();

        let mut report = LearnReport::default();
        for key in keys {
            let targets = &groups[&key];
            if targets.len() < self.min_occurrences {
                continue;
            }
            report.candidates += 1;

            let (target, count) = dominant_target(targets);
            let consistency = count as f64 / targets.len() as f64;
            if consistency < self.min_consistency {
                debug!(
                    "'{}' detail {:?}: dominant target {}/{:?} at {:.0}% consistency, below gate",
                    key.0,
                    key.1,
                    target.0,
                    target.1,
                    consistency * 100.0
                );
                report.below_consistency += 1;
                continue;
            }

            let (category, subcategory) = target;
            if taxonomy.validate(&category, subcategory.as_deref()).is_err() {
                warn!(
                    "History for '{}' points at unknown target {}/{:?}; skipping",
                    key.0, category, subcategory
                );
                continue;
            }

            let (merchant, detail) = key;
            let pack = if detail.is_some() {
                RulePack::CompositeLearned
            } else {
                RulePack::Learned
            };
            let new_rule = NewRule {
                pack,
                priority: None,
                match_type: MatchType::Exact,
                match_value: merchant.clone(),
                match_detail: detail,
                category,
                subcategory,
                created_by: Some("learner".to_string()),
                notes: Some(format!("Learned from {} confirmed transactions", targets.len())),
            };

            match self.db.promote_rule(&new_rule, &taxonomy, &self.tiers, false)? {
                PromotionOutcome::Created(rule) => {
                    info!("Learned rule {} for '{}' -> {}", rule.id, merchant, rule.category);
                    report.created += 1;
                }
                PromotionOutcome::Duplicate { .. } | PromotionOutcome::Retargeted(_) => {
                    report.skipped_existing += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Most common (category, subcategory) in a group; ties break toward the
/// lexicographically smaller target so reruns are deterministic
fn dominant_target(targets: &[(String, Option<String>)]) -> ((String, Option<String>), usize) {
    let mut counts: HashMap<&(String, Option<String>), usize> = HashMap::new();
    for target in targets {
        *counts.entry(target).or_default() += 1;
    }
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let (target, count) = ranked[0];
    (target.clone(), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionInsertResult;
    use crate::models::{CategorizationResult, NewTransaction, TagSource, Taxonomy};
    use chrono::NaiveDate;

    fn seeded_db() -> (Database, Taxonomy) {
        let db = Database::in_memory().unwrap();
        db.seed_taxonomy().unwrap();
        let taxonomy = db.load_taxonomy().unwrap();
        (db, taxonomy)
    }

    fn insert_tx(db: &Database, hash: &str, merchant: &str, detail: Option<&str>) -> i64 {
        match db
            .insert_transaction(&NewTransaction {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                description: merchant.to_string(),
                merchant: merchant.to_string(),
                detail: detail.map(str::to_string),
                amount: -8.0,
                import_hash: hash.to_string(),
                original_data: None,
            })
            .unwrap()
        {
            TransactionInsertResult::Inserted(id) => id,
            TransactionInsertResult::Duplicate(id) => id,
        }
    }

    fn confirm(
        db: &Database,
        taxonomy: &Taxonomy,
        hash: &str,
        merchant: &str,
        detail: Option<&str>,
        category: &str,
        subcategory: Option<&str>,
    ) {
        let id = insert_tx(db, hash, merchant, detail);
        db.apply_review(id, category, subcategory, taxonomy).unwrap();
    }

    fn llm_tag(db: &Database, id: i64, category: &str, confidence: f64, needs_review: bool) {
        db.apply_categorization(
            id,
            &CategorizationResult {
                category: Some(category.to_string()),
                subcategory: None,
                tag_source: Some(TagSource::Llm),
                tag_confidence: confidence,
                needs_review,
                matched_rule_id: None,
                rationale: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_learn_needs_enough_occurrences() {
        let (db, taxonomy) = seeded_db();
        for i in 0..3 {
            confirm(
                &db,
                &taxonomy,
                &format!("l{}", i),
                "SQ",
                Some("BREADS BAKERY"),
                "Food & Drink",
                Some("Coffee"),
            );
        }
        // Only two sightings of this one
        for i in 0..2 {
            confirm(
                &db,
                &taxonomy,
                &format!("m{}", i),
                "SQ",
                Some("ARATA SUSHI"),
                "Food & Drink",
                Some("Restaurants"),
            );
        }

        let report = PatternLearner::new(&db).learn().unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.created, 1);

        let rules = db.load_active_rules().unwrap();
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.match_value, "SQ");
        assert_eq!(rule.match_detail.as_deref(), Some("BREADS BAKERY"));
        assert_eq!(rule.pack, RulePack::CompositeLearned);
        assert_eq!(rule.priority, 50);
        assert_eq!(rule.subcategory.as_deref(), Some("Coffee"));
    }

    #[test]
    fn test_learn_consistency_gate() {
        let (db, taxonomy) = seeded_db();
        // 3 coffee votes, 1 snacks vote: 75% consistency
        for i in 0..3 {
            confirm(
                &db,
                &taxonomy,
                &format!("c{}", i),
                "SQ",
                Some("BREADS BAKERY"),
                "Food & Drink",
                Some("Coffee"),
            );
        }
        confirm(
            &db,
            &taxonomy,
            "c3",
            "SQ",
            Some("BREADS BAKERY"),
            "Food & Drink",
            Some("Snacks"),
        );

        let report = PatternLearner::new(&db).learn().unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.created, 0);
        assert_eq!(report.below_consistency, 1);
        assert!(db.load_active_rules().unwrap().is_empty());

        // A looser gate accepts the dominant target
        let report = PatternLearner::new(&db)
            .with_thresholds(3, 0.70)
            .learn()
            .unwrap();
        assert_eq!(report.created, 1);
        let rules = db.load_active_rules().unwrap();
        assert_eq!(rules[0].subcategory.as_deref(), Some("Coffee"));
    }

    #[test]
    fn test_learn_skips_existing_rules() {
        let (db, taxonomy) = seeded_db();
        for i in 0..3 {
            confirm(
                &db,
                &taxonomy,
                &format!("s{}", i),
                "SQ",
                Some("BREADS BAKERY"),
                "Food & Drink",
                Some("Coffee"),
            );
        }

        let first = PatternLearner::new(&db).learn().unwrap();
        assert_eq!(first.created, 1);

        let second = PatternLearner::new(&db).learn().unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped_existing, 1);
        assert_eq!(db.load_active_rules().unwrap().len(), 1);
    }

    #[test]
    fn test_learn_simple_merchant_lands_in_learned_tier() {
        let (db, taxonomy) = seeded_db();
        for i in 0..3 {
            confirm(
                &db,
                &taxonomy,
                &format!("a{}", i),
                "AMAZON",
                None,
                "Shopping",
                Some("Amazon"),
            );
        }

        let report = PatternLearner::new(&db).learn().unwrap();
        assert_eq!(report.created, 1);
        let rules = db.load_active_rules().unwrap();
        assert_eq!(rules[0].pack, RulePack::Learned);
        assert_eq!(rules[0].priority, 100);
        assert!(rules[0].match_detail.is_none());
    }

    #[test]
    fn test_learn_counts_confident_llm_votes_but_not_reviews() {
        let (db, taxonomy) = seeded_db();
        // Two manual votes plus one confident LLM vote reach the gate
        confirm(&db, &taxonomy, "v0", "WHOLEFDS", None, "Groceries", None);
        confirm(&db, &taxonomy, "v1", "WHOLEFDS", None, "Groceries", None);
        let id = insert_tx(&db, "v2", "WHOLEFDS", None);
        llm_tag(&db, id, "Groceries", 0.95, false);

        // Low-confidence LLM rows waiting for review never count
        for i in 0..3 {
            let id = insert_tx(&db, &format!("w{}", i), "CORNER STORE", None);
            llm_tag(&db, id, "Groceries", 0.40, true);
        }

        let report = PatternLearner::new(&db).learn().unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.created, 1);
        let rules = db.load_active_rules().unwrap();
        assert_eq!(rules[0].match_value, "WHOLEFDS");
        assert_eq!(rules[0].category, "Groceries");
    }
}
