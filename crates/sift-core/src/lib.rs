//! Sift Core Library
//!
//! Shared functionality for the Sift transaction categorizer:
//! - Encrypted SQLite store: rules, taxonomy, transactions, review queue
//! - Rule matcher with priority and specificity tie-breaks
//! - Categorization engine: rules first, local LLM fallback, review gating
//! - Rule promotion (manual decision -> persisted rule) and pattern learner
//! - Pluggable local AI backends (Ollama, mock)
//! - Fixed-layout CSV ingest with hash deduplication

pub mod ai;
pub mod categorize;
pub mod db;
pub mod error;
pub mod ingest;
pub mod learn;
pub mod matcher;
pub mod models;
pub mod promote;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AiBackend, AiClient, CategorySuggestion, MockBackend, OllamaBackend};
pub use categorize::{Categorizer, DEFAULT_REVIEW_THRESHOLD};
pub use db::{Database, TransactionInsertResult};
pub use error::{Error, Result};
pub use ingest::{ImportResult, UNKNOWN_MERCHANT};
pub use learn::{LearnReport, PatternLearner, DEFAULT_MIN_CONSISTENCY, DEFAULT_MIN_OCCURRENCES};
pub use matcher::RuleMatcher;
pub use models::{
    BatchOutcome, CategorizationResult, MatchType, NewRule, NewTransaction, PriorityTiers,
    PromotionOutcome, Rule, RulePack, TagSource, Taxonomy, TaxonomyCategory, Transaction,
};
pub use promote::Promoter;
