//! Rule matching engine for transaction categorization
//!
//! Rules are evaluated against the normalized (merchant, detail) pair of a
//! transaction. When several rules match, the winner is the one with the
//! lowest priority number; a composite rule (merchant + detail) beats a
//! simple rule at the same priority, and the lowest rule id breaks any
//! remaining tie, so repeated runs always pick the same rule.

use std::collections::HashMap;

use regex::Regex;
use tracing::warn;

use crate::models::{MatchType, Rule};

/// Compiled, priority-ordered view of the active rule set
pub struct RuleMatcher {
    rules: Vec<Rule>,
    /// Pre-compiled regexes for pattern rules, keyed by rule id.
    /// Rules whose pattern failed to compile are simply absent and never match.
    compiled: HashMap<i64, Regex>,
}

impl RuleMatcher {
    /// Build a matcher from a rule set. Inactive rules are dropped and
    /// malformed pattern rules are skipped with a warning; a bad pattern in
    /// the database must never take categorization down.
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut rules: Vec<Rule> = rules.into_iter().filter(|r| r.active).collect();
        rules.sort_by_key(|r| (r.priority, r.id));

        let mut compiled = HashMap::new();
        for rule in &rules {
            if rule.match_type != MatchType::Pattern {
                continue;
            }
            match Regex::new(&rule.match_value) {
                Ok(re) => {
                    compiled.insert(rule.id, re);
                }
                Err(e) => {
                    warn!(
                        "Skipping rule {} ('{}'): invalid pattern: {}",
                        rule.id, rule.match_value, e
                    );
                }
            }
        }

        Self { rules, compiled }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the winning rule for a transaction, if any
    pub fn match_transaction(&self, merchant: &str, detail: Option<&str>) -> Option<&Rule> {
        self.matching_rules(merchant, detail)
            .into_iter()
            .min_by_key(|r| (r.priority, !r.is_composite(), r.id))
    }

    /// All rules that match a transaction, in priority order. Used by the
    /// winner selection above and by `rules test` to show every candidate.
    pub fn matching_rules(&self, merchant: &str, detail: Option<&str>) -> Vec<&Rule> {
        if merchant.trim().is_empty() {
            return Vec::new();
        }

        self.rules
            .iter()
            .filter(|rule| self.rule_matches(rule, merchant, detail))
            .collect()
    }

    fn rule_matches(&self, rule: &Rule, merchant: &str, detail: Option<&str>) -> bool {
        if !self.value_matches(rule, &rule.match_value, merchant) {
            return false;
        }

        // Composite rules also require the detail to line up; a transaction
        // with no detail can only ever match a simple rule.
        match (&rule.match_detail, detail) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(rule_detail), Some(tx_detail)) => {
                self.value_matches(rule, rule_detail, tx_detail)
            }
        }
    }

    /// Compare one rule value against one transaction field. Inputs arrive
    /// pre-normalized, but comparisons stay case-insensitive so hand-entered
    /// rules behave the same as promoted ones.
    fn value_matches(&self, rule: &Rule, value: &str, candidate: &str) -> bool {
        let candidate = candidate.trim();
        let candidate_upper = candidate.to_uppercase();

        match rule.match_type {
            MatchType::Exact => candidate_upper == value.trim().to_uppercase(),
            MatchType::Contains => candidate_upper.contains(&value.trim().to_uppercase()),
            MatchType::Prefix => candidate_upper.starts_with(&value.trim().to_uppercase()),
            MatchType::Pattern => match self.compiled.get(&rule.id) {
                Some(re) => re.is_match(candidate) || re.is_match(&candidate_upper),
                None => false,
            },
        }
    }
}
