//! Transaction operations: inserts, categorization writes, review queue

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{CategorizationResult, NewTransaction, TagSource, Taxonomy, Transaction};

/// Result of inserting a transaction
#[derive(Debug, Clone)]
pub enum TransactionInsertResult {
    /// Transaction was inserted successfully, contains new transaction ID
    Inserted(i64),
    /// Transaction was a duplicate, contains existing transaction ID
    Duplicate(i64),
}

const TX_COLUMNS: &str = "id, date, description, merchant, detail, amount, import_hash, \
     category, subcategory, tag_source, tag_confidence, needs_review, matched_rule_id, \
     rationale, created_at";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(1)?;
    let tag_source_str: Option<String> = row.get(9)?;
    let created_at_str: String = row.get(14)?;

    Ok(Transaction {
        id: row.get(0)?,
        date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
        description: row.get(2)?,
        merchant: row.get(3)?,
        detail: row.get(4)?,
        amount: row.get(5)?,
        import_hash: row.get(6)?,
        category: row.get(7)?,
        subcategory: row.get(8)?,
        tag_source: tag_source_str.and_then(|s| s.parse::<TagSource>().ok()),
        tag_confidence: row.get(10)?,
        needs_review: row.get(11)?,
        matched_rule_id: row.get(12)?,
        rationale: row.get(13)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Insert a transaction (skips duplicates based on import_hash)
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<TransactionInsertResult> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            return Ok(TransactionInsertResult::Duplicate(existing_id));
        }

        conn.execute(
            r#"
            INSERT INTO transactions (date, description, merchant, detail, amount,
                                      import_hash, original_data)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.date.to_string(),
                tx.description,
                tx.merchant,
                tx.detail,
                tx.amount,
                tx.import_hash,
                tx.original_data,
            ],
        )?;

        Ok(TransactionInsertResult::Inserted(conn.last_insert_rowid()))
    }

    /// Get a single transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?", TX_COLUMNS),
            params![id],
            transaction_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound(format!("Transaction {}", id)),
            other => Error::Database(other),
        })
    }

    /// List recent transactions for display
    pub fn list_transactions(&self, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions ORDER BY date DESC, id DESC LIMIT ?",
            TX_COLUMNS
        ))?;

        let txs = stmt
            .query_map(params![limit], transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(txs)
    }

    /// Transactions that have never been categorized (no tag source yet).
    /// This includes ones a previous run parked for review with no category,
    /// so a re-run with the LLM enabled gets another shot at them.
    pub fn list_uncategorized(&self, limit: Option<i64>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let limit = limit.unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE tag_source IS NULL
            ORDER BY date, id
            LIMIT ?
            "#,
            TX_COLUMNS
        ))?;

        let txs = stmt
            .query_map(params![limit], transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(txs)
    }

    /// The review queue: everything flagged `needs_review`, oldest first
    pub fn list_review_queue(&self, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE needs_review = 1
            ORDER BY date, id
            LIMIT ?
            "#,
            TX_COLUMNS
        ))?;

        let txs = stmt
            .query_map(params![limit], transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(txs)
    }

    /// Write a categorization outcome onto a transaction
    pub fn apply_categorization(&self, id: i64, result: &CategorizationResult) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE transactions
            SET category = ?, subcategory = ?, tag_source = ?, tag_confidence = ?,
                needs_review = ?, matched_rule_id = ?, rationale = ?
            WHERE id = ?
            "#,
            params![
                result.category,
                result.subcategory,
                result.tag_source.map(|s| s.as_str()),
                result.tag_confidence,
                result.needs_review,
                result.matched_rule_id,
                result.rationale,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Apply a manual review decision: the user's explicit choice always wins
    /// for this one transaction, full confidence, out of the review queue.
    pub fn apply_review(
        &self,
        id: i64,
        category: &str,
        subcategory: Option<&str>,
        taxonomy: &Taxonomy,
    ) -> Result<Transaction> {
        taxonomy.validate(category, subcategory)?;

        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE transactions
            SET category = ?, subcategory = ?, tag_source = 'manual', tag_confidence = 1.0,
                needs_review = 0, matched_rule_id = NULL, rationale = NULL
            WHERE id = ?
            "#,
            params![category, subcategory, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }

        self.get_transaction(id)
    }

    /// Confirmed (merchant, detail, category, subcategory) rows for the
    /// pattern learner: manual decisions, plus LLM suggestions that cleared
    /// the review threshold. Rule hits are excluded - they would only
    /// re-derive the rule that produced them.
    pub fn categorized_history(
        &self,
    ) -> Result<Vec<(String, Option<String>, String, Option<String>)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT merchant, detail, category, subcategory
            FROM transactions
            WHERE category IS NOT NULL
              AND (tag_source = 'manual' OR (tag_source = 'llm' AND needs_review = 0))
            ORDER BY merchant, detail
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Total transaction count, for status output
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?)
    }

    /// Review queue depth, for status output
    pub fn count_review_queue(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE needs_review = 1",
            [],
            |row| row.get(0),
        )?)
    }
}
