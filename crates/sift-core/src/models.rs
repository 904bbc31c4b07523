//! Domain models for sift

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a rule's `match_value` is compared against the normalized merchant.
///
/// Composite rules apply the same comparison to the detail token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Merchant equals the match value (case-insensitive, trimmed)
    Exact,
    /// Match value is a substring of the merchant
    Contains,
    /// Merchant starts with the match value
    Prefix,
    /// Match value is a regular expression applied to the merchant
    Pattern,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::Prefix => "prefix",
            Self::Pattern => "pattern",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            "prefix" | "startswith" => Ok(Self::Prefix),
            "pattern" | "regex" => Ok(Self::Pattern),
            _ => Err(format!("Unknown match type: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provenance grouping for a rule. Informational, and used to default the
/// rule's priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RulePack {
    /// Hand-written by the user
    Manual,
    /// Promoted from a review decision with a detail token
    CompositeLearned,
    /// Generated from categorized history
    Learned,
    /// Shipped with the starter seed
    System,
}

impl RulePack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::CompositeLearned => "composite-learned",
            Self::Learned => "learned",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for RulePack {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "composite-learned" | "composite_learned" => Ok(Self::CompositeLearned),
            "learned" => Ok(Self::Learned),
            "system" => Ok(Self::System),
            _ => Err(format!("Unknown rule pack: {}", s)),
        }
    }
}

impl std::fmt::Display for RulePack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority tiers for rule packs. Lower values win during matching.
///
/// The conventional values are manual=10, composite=50, learned=100, but the
/// tiers are configuration, not constants. The ordering invariant
/// `manual < composite < learned` always holds; `new()` rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTiers {
    pub manual: i64,
    pub composite: i64,
    pub learned: i64,
}

impl PriorityTiers {
    pub fn new(manual: i64, composite: i64, learned: i64) -> Result<Self> {
        if !(manual < composite && composite < learned) {
            return Err(Error::InvalidData(format!(
                "Priority tiers must be ordered manual < composite < learned, got {}/{}/{}",
                manual, composite, learned
            )));
        }
        Ok(Self {
            manual,
            composite,
            learned,
        })
    }

    /// Default priority for a rule of the given pack.
    ///
    /// System rules share the learned tier: shipped defaults never outrank
    /// anything the user wrote or confirmed.
    pub fn for_pack(&self, pack: RulePack) -> i64 {
        match pack {
            RulePack::Manual => self.manual,
            RulePack::CompositeLearned => self.composite,
            RulePack::Learned | RulePack::System => self.learned,
        }
    }
}

impl Default for PriorityTiers {
    fn default() -> Self {
        Self {
            manual: 10,
            composite: 50,
            learned: 100,
        }
    }
}

/// Where a transaction's categorization came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// A rule from the rule table matched
    Rule,
    /// The LLM fallback suggested it
    Llm,
    /// The user decided during review
    Manual,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Llm => "llm",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for TagSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rule" => Ok(Self::Rule),
            "llm" => Ok(Self::Llm),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown tag source: {}", s)),
        }
    }
}

impl std::fmt::Display for TagSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A categorization rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub pack: RulePack,
    /// Lower value wins when several rules match
    pub priority: i64,
    pub match_type: MatchType,
    /// Compared against the normalized merchant
    pub match_value: String,
    /// Present = composite rule: the detail token must also match.
    /// Absent = simple rule: merchant alone decides.
    pub match_detail: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    /// Inactive rules are kept for audit but never match
    pub active: bool,
    pub created_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// Composite rules carry a detail token and require it to match
    pub fn is_composite(&self) -> bool {
        self.match_detail.is_some()
    }
}

/// What a promotion did. A duplicate is a normal outcome, not an error.
#[derive(Debug, Clone)]
pub enum PromotionOutcome {
    /// No equivalent active rule existed; this one was created
    Created(Rule),
    /// An equivalent active rule already exists and was left untouched
    Duplicate { existing: Rule },
    /// An equivalent active rule existed and its target was overwritten
    Retargeted(Rule),
}

impl PromotionOutcome {
    /// The rule this promotion resolved to, whichever way it went
    pub fn rule(&self) -> &Rule {
        match self {
            Self::Created(rule) => rule,
            Self::Duplicate { existing } => existing,
            Self::Retargeted(rule) => rule,
        }
    }

    pub fn created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// A rule to be inserted. `priority: None` defaults from the pack's tier.
#[derive(Debug, Clone)]
pub struct NewRule {
    pub pack: RulePack,
    pub priority: Option<i64>,
    pub match_type: MatchType,
    pub match_value: String,
    pub match_detail: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub created_by: Option<String>,
    pub notes: Option<String>,
}

/// A transaction as stored
///
/// The normalized `merchant` and optional `detail` tokens are supplied at
/// ingest by the upstream normalizer (already upper-cased and trimmed); the
/// core never re-derives them from the raw description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub merchant: String,
    pub detail: Option<String>,
    pub amount: f64,
    /// SHA-256 over date/description/amount, the dedup key for re-imports
    pub import_hash: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tag_source: Option<TagSource>,
    pub tag_confidence: Option<f64>,
    pub needs_review: bool,
    /// Which rule decided the category, when `tag_source` is `rule`
    pub matched_rule_id: Option<i64>,
    /// The LLM's one-line justification, when `tag_source` is `llm`
    pub rationale: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A transaction parsed from the ingest CSV, ready for insert
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub merchant: String,
    pub detail: Option<String>,
    pub amount: f64,
    pub import_hash: String,
    /// Original CSV row as JSON, kept for audit
    pub original_data: Option<String>,
}

/// The outcome of categorizing one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationResult {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tag_source: Option<TagSource>,
    pub tag_confidence: f64,
    pub needs_review: bool,
    pub matched_rule_id: Option<i64>,
    pub rationale: Option<String>,
}

impl CategorizationResult {
    /// A rule hit: full confidence, no review, LLM never consulted
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            category: Some(rule.category.clone()),
            subcategory: rule.subcategory.clone(),
            tag_source: Some(TagSource::Rule),
            tag_confidence: 1.0,
            needs_review: false,
            matched_rule_id: Some(rule.id),
            rationale: None,
        }
    }

    /// No rule matched and the LLM could not help: park it for review
    pub fn unresolved() -> Self {
        Self {
            category: None,
            subcategory: None,
            tag_source: None,
            tag_confidence: 0.0,
            needs_review: true,
            matched_rule_id: None,
            rationale: None,
        }
    }
}

/// Running totals for a categorization batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub rule_matched: usize,
    pub llm_suggested: usize,
    pub unresolved: usize,
    pub needs_review: usize,
    /// Categorized at or above the review threshold
    pub high_confidence: usize,
}

impl BatchOutcome {
    pub fn record(&mut self, result: &CategorizationResult) {
        self.total += 1;
        match result.tag_source {
            Some(TagSource::Rule) => self.rule_matched += 1,
            Some(TagSource::Llm) => self.llm_suggested += 1,
            Some(TagSource::Manual) => {}
            None => self.unresolved += 1,
        }
        if result.needs_review {
            self.needs_review += 1;
        } else if result.tag_source.is_some() {
            self.high_confidence += 1;
        }
    }
}

/// A category with its metadata and subcategories, as listed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyCategory {
    pub name: String,
    pub display_order: i64,
    pub is_income: bool,
    pub is_transfer: bool,
    pub subcategories: Vec<String>,
}

/// The category/subcategory taxonomy, loaded once per run.
///
/// Every rule write and every categorization write is validated against it;
/// a pair outside the taxonomy is the one condition that blocks a write.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    categories: Vec<TaxonomyCategory>,
    index: BTreeMap<String, BTreeSet<String>>,
}

impl Taxonomy {
    pub fn new(categories: Vec<TaxonomyCategory>) -> Self {
        let index = categories
            .iter()
            .map(|c| (c.name.clone(), c.subcategories.iter().cloned().collect()))
            .collect();
        Self { categories, index }
    }

    pub fn categories(&self) -> &[TaxonomyCategory] {
        &self.categories
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.index.contains_key(category)
    }

    /// Check a (category, subcategory) pair. A missing subcategory is valid
    /// for any known category.
    pub fn validate(&self, category: &str, subcategory: Option<&str>) -> Result<()> {
        let subs = self.index.get(category).ok_or_else(|| {
            Error::Taxonomy(format!("Unknown category: {:?}", category))
        })?;
        if let Some(sub) = subcategory {
            if !subs.contains(sub) {
                return Err(Error::Taxonomy(format!(
                    "Subcategory {:?} does not belong to category {:?}",
                    sub, category
                )));
            }
        }
        Ok(())
    }

    /// One line per category for the LLM prompt: `Category: sub, sub, ...`
    pub fn prompt_listing(&self) -> String {
        let mut lines = Vec::with_capacity(self.categories.len());
        for cat in &self.categories {
            if cat.subcategories.is_empty() {
                lines.push(format!("- {}", cat.name));
            } else {
                lines.push(format!("- {}: {}", cat.name, cat.subcategories.join(", ")));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_round_trip() {
        for (s, mt) in [
            ("exact", MatchType::Exact),
            ("contains", MatchType::Contains),
            ("prefix", MatchType::Prefix),
            ("pattern", MatchType::Pattern),
        ] {
            assert_eq!(s.parse::<MatchType>().unwrap(), mt);
            assert_eq!(mt.as_str(), s);
        }
        // Aliases kept for imported rule exports
        assert_eq!("startswith".parse::<MatchType>().unwrap(), MatchType::Prefix);
        assert_eq!("regex".parse::<MatchType>().unwrap(), MatchType::Pattern);
        assert!("fuzzy".parse::<MatchType>().is_err());
    }

    #[test]
    fn rule_pack_round_trip() {
        assert_eq!(
            "composite-learned".parse::<RulePack>().unwrap(),
            RulePack::CompositeLearned
        );
        assert_eq!(RulePack::CompositeLearned.to_string(), "composite-learned");
        assert_eq!("system".parse::<RulePack>().unwrap(), RulePack::System);
    }

    #[test]
    fn priority_tiers_enforce_ordering() {
        assert!(PriorityTiers::new(10, 50, 100).is_ok());
        assert!(PriorityTiers::new(50, 10, 100).is_err());
        assert!(PriorityTiers::new(10, 10, 100).is_err());

        let tiers = PriorityTiers::default();
        assert!(tiers.for_pack(RulePack::Manual) < tiers.for_pack(RulePack::CompositeLearned));
        assert!(tiers.for_pack(RulePack::CompositeLearned) < tiers.for_pack(RulePack::Learned));
        assert_eq!(
            tiers.for_pack(RulePack::System),
            tiers.for_pack(RulePack::Learned)
        );
    }

    #[test]
    fn batch_outcome_buckets() {
        let mut outcome = BatchOutcome::default();
        let rule = Rule {
            id: 1,
            pack: RulePack::Manual,
            priority: 10,
            match_type: MatchType::Exact,
            match_value: "TRADER JOES".into(),
            match_detail: None,
            category: "Groceries".into(),
            subcategory: None,
            active: true,
            created_by: None,
            notes: None,
            created_at: Utc::now(),
        };
        outcome.record(&CategorizationResult::from_rule(&rule));
        outcome.record(&CategorizationResult::unresolved());

        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.rule_matched, 1);
        assert_eq!(outcome.unresolved, 1);
        assert_eq!(outcome.needs_review, 1);
        assert_eq!(outcome.high_confidence, 1);
    }

    #[test]
    fn taxonomy_validates_pairs() {
        let taxonomy = Taxonomy::new(vec![TaxonomyCategory {
            name: "Food & Drink".into(),
            display_order: 1,
            is_income: false,
            is_transfer: false,
            subcategories: vec!["Coffee".into(), "Restaurants".into()],
        }]);

        assert!(taxonomy.validate("Food & Drink", Some("Coffee")).is_ok());
        assert!(taxonomy.validate("Food & Drink", None).is_ok());
        assert!(taxonomy.validate("Food & Drink", Some("Gas")).is_err());
        assert!(taxonomy.validate("Vehicles", None).is_err());
    }
}
