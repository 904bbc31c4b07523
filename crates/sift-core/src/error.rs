//! Error types for sift

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Category/subcategory pair rejected by the taxonomy. The one error
    /// that must block a rule or categorization write.
    #[error("Taxonomy violation: {0}")]
    Taxonomy(String),

    /// An equivalent active rule already exists. Surfaced by promotion as a
    /// value (`PromotionOutcome::Duplicate`), only raised when a raw insert
    /// is attempted anyway.
    #[error("Duplicate rule: an active rule with the same match already exists (id {existing_id})")]
    DuplicateRule { existing_id: i64 },

    #[error("AI backend error: {0}")]
    Ai(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
