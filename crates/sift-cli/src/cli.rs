//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sift - Rule-first transaction categorizer with a local LLM fallback
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Rule-first personal transaction categorizer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "sift.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SIFT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed the category taxonomy
    Init,

    /// Import transactions from CSV (date,description,merchant,detail,amount)
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Import only; skip the categorization pass
        #[arg(long)]
        no_categorize: bool,

        /// Skip the LLM fallback; transactions no rule covers go to review
        #[arg(long)]
        no_llm: bool,

        /// LLM suggestions below this confidence are queued for review
        #[arg(long, default_value = "0.9")]
        threshold: f64,
    },

    /// Categorize transactions that have no category yet
    Categorize {
        /// Maximum number of transactions to process
        #[arg(short, long)]
        limit: Option<i64>,

        /// Skip the LLM fallback; transactions no rule covers go to review
        #[arg(long)]
        no_llm: bool,

        /// LLM suggestions below this confidence are queued for review
        #[arg(long, default_value = "0.9")]
        threshold: f64,
    },

    /// Work the review queue
    Review {
        #[command(subcommand)]
        action: Option<ReviewAction>,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Mine confirmed history into learned rules
    Learn {
        /// Confirmed sightings required before a merchant is considered
        #[arg(long, default_value = "3")]
        min_occurrences: usize,

        /// Share of sightings that must agree on a single target
        #[arg(long, default_value = "0.9")]
        min_consistency: f64,
    },

    /// List the category taxonomy
    Taxonomy,

    /// Show database status
    Status,
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// List transactions waiting for review (default)
    List {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Apply a category to a transaction, clearing it from the queue
    Apply {
        /// Transaction ID
        #[arg(long)]
        id: i64,

        /// Category name
        #[arg(long)]
        category: String,

        /// Subcategory name
        #[arg(long)]
        subcategory: Option<String>,

        /// Also create a rule from this decision
        #[arg(long)]
        promote: bool,

        /// If an equivalent rule exists, retarget it instead of keeping it
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules (default)
    List {
        /// Include deactivated rules
        #[arg(long)]
        all: bool,
    },

    /// Add a rule
    Add {
        /// Merchant value to match
        #[arg(long)]
        merchant: String,

        /// Detail value to also match (makes the rule composite)
        #[arg(long)]
        detail: Option<String>,

        /// Match type: exact, contains, prefix, pattern
        #[arg(long, default_value = "exact")]
        match_type: String,

        /// Target category
        #[arg(long)]
        category: String,

        /// Target subcategory
        #[arg(long)]
        subcategory: Option<String>,

        /// Rule pack: manual, composite-learned, learned, system
        #[arg(long, default_value = "manual")]
        pack: String,

        /// Explicit priority (defaults to the pack's tier)
        #[arg(long)]
        priority: Option<i64>,

        /// Notes about why this rule exists
        #[arg(long)]
        notes: Option<String>,
    },

    /// Deactivate a rule
    Delete {
        /// Rule ID
        #[arg(long)]
        id: i64,
    },

    /// Dry-run the matcher against a merchant/detail pair
    Test {
        /// Merchant value
        #[arg(long)]
        merchant: String,

        /// Detail value
        #[arg(long)]
        detail: Option<String>,
    },
}
