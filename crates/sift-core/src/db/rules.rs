//! Rule store operations
//!
//! The rule table is the single source of truth for categorization rules.
//! Matching reads an immutable snapshot via `load_active_rules`; the only
//! mutation paths are `insert_rule`, `promote_rule` (the serialized
//! check-then-insert used by the learning loop), and deactivation.

use rusqlite::{params, Row};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{MatchType, NewRule, PriorityTiers, PromotionOutcome, Rule, RulePack, Taxonomy};

use super::{parse_datetime, Database, DbConn};

const RULE_COLUMNS: &str = "id, pack, priority, match_type, match_value, match_detail, \
     category, subcategory, active, created_by, notes, created_at";

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<Rule> {
    let pack_str: String = row.get(1)?;
    let match_type_str: String = row.get(3)?;
    let created_at_str: String = row.get(11)?;

    Ok(Rule {
        id: row.get(0)?,
        pack: pack_str.parse().unwrap_or(RulePack::Manual),
        priority: row.get(2)?,
        match_type: match_type_str.parse().unwrap_or(MatchType::Exact),
        match_value: row.get(4)?,
        match_detail: row.get(5)?,
        category: row.get(6)?,
        subcategory: row.get(7)?,
        active: row.get(8)?,
        created_by: row.get(9)?,
        notes: row.get(10)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Load the active rule set, ordered the way the matcher consumes it
    /// (priority ascending, then id for a stable tie-break).
    pub fn load_active_rules(&self) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rules WHERE active = 1 ORDER BY priority, id",
            RULE_COLUMNS
        ))?;

        let rules = stmt
            .query_map([], rule_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// List rules for display, optionally including deactivated ones
    pub fn list_rules(&self, include_inactive: bool) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let sql = if include_inactive {
            format!("SELECT {} FROM rules ORDER BY priority, id", RULE_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM rules WHERE active = 1 ORDER BY priority, id",
                RULE_COLUMNS
            )
        };
        let mut stmt = conn.prepare(&sql)?;

        let rules = stmt
            .query_map([], rule_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// Get a single rule by id
    pub fn get_rule(&self, id: i64) -> Result<Rule> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM rules WHERE id = ?", RULE_COLUMNS),
            params![id],
            rule_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound(format!("Rule {}", id)),
            other => Error::Database(other),
        })
    }

    /// Find an active rule with an identical (match_type, match_value, match_detail)
    pub fn find_rule(
        &self,
        match_type: MatchType,
        match_value: &str,
        match_detail: Option<&str>,
    ) -> Result<Option<Rule>> {
        let conn = self.conn()?;
        Self::find_rule_on(&conn, match_type, match_value, match_detail)
    }

    fn find_rule_on(
        conn: &DbConn,
        match_type: MatchType,
        match_value: &str,
        match_detail: Option<&str>,
    ) -> Result<Option<Rule>> {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM rules
            WHERE active = 1
              AND match_type = ?
              AND match_value = ?
              AND match_detail IS ?
            ORDER BY id
            LIMIT 1
            "#,
            RULE_COLUMNS
        ))?;

        let rule = stmt
            .query_row(
                params![match_type.as_str(), match_value, match_detail],
                rule_from_row,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        Ok(rule)
    }

    /// Insert a rule. The (category, subcategory) pair is validated against
    /// the taxonomy; a missing priority defaults from the pack's tier; a
    /// `pattern` rule must carry a compilable regex.
    ///
    /// Fails with `Error::DuplicateRule` if an equivalent active rule already
    /// exists - callers that want the duplicate as a value use `promote_rule`.
    pub fn insert_rule(
        &self,
        new: &NewRule,
        taxonomy: &Taxonomy,
        tiers: &PriorityTiers,
    ) -> Result<Rule> {
        taxonomy.validate(&new.category, new.subcategory.as_deref())?;
        if new.match_type == MatchType::Pattern {
            // The matcher only skips malformed patterns; catch them at insert.
            regex::Regex::new(&new.match_value)?;
        }

        if let Some(existing) =
            self.find_rule(new.match_type, &new.match_value, new.match_detail.as_deref())?
        {
            return Err(Error::DuplicateRule {
                existing_id: existing.id,
            });
        }

        let conn = self.conn()?;
        let id = Self::insert_rule_on(&conn, new, tiers)?;
        self.get_rule(id)
    }

    fn insert_rule_on(conn: &DbConn, new: &NewRule, tiers: &PriorityTiers) -> Result<i64> {
        let priority = new.priority.unwrap_or_else(|| tiers.for_pack(new.pack));
        conn.execute(
            r#"
            INSERT INTO rules (pack, priority, match_type, match_value, match_detail,
                               category, subcategory, created_by, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                new.pack.as_str(),
                priority,
                new.match_type.as_str(),
                new.match_value,
                new.match_detail,
                new.category,
                new.subcategory,
                new.created_by,
                new.notes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Atomic check-then-insert for the promotion/learning loop.
    ///
    /// Runs inside one immediate transaction so two concurrent promotions
    /// cannot both pass the duplicate check: the write lock is taken before
    /// the re-check, and at most one promotion commits at a time.
    pub fn promote_rule(
        &self,
        new: &NewRule,
        taxonomy: &Taxonomy,
        tiers: &PriorityTiers,
        overwrite: bool,
    ) -> Result<PromotionOutcome> {
        taxonomy.validate(&new.category, new.subcategory.as_deref())?;

        let conn = self.conn()?;
        conn.execute("BEGIN IMMEDIATE TRANSACTION", [])?;

        let result = (|| -> Result<PromotionOutcome> {
            let existing = Self::find_rule_on(
                &conn,
                new.match_type,
                &new.match_value,
                new.match_detail.as_deref(),
            )?;

            match existing {
                Some(rule)
                    if !overwrite
                        || (rule.category == new.category
                            && rule.subcategory == new.subcategory) =>
                {
                    debug!(rule_id = rule.id, "Promotion found an equivalent active rule");
                    Ok(PromotionOutcome::Duplicate { existing: rule })
                }
                Some(rule) => {
                    conn.execute(
                        "UPDATE rules SET category = ?, subcategory = ? WHERE id = ?",
                        params![new.category, new.subcategory, rule.id],
                    )?;
                    let mut updated = rule;
                    updated.category = new.category.clone();
                    updated.subcategory = new.subcategory.clone();
                    debug!(rule_id = updated.id, "Promotion retargeted an existing rule");
                    Ok(PromotionOutcome::Retargeted(updated))
                }
                None => {
                    let id = Self::insert_rule_on(&conn, new, tiers)?;
                    let rule = conn.query_row(
                        &format!("SELECT {} FROM rules WHERE id = ?", RULE_COLUMNS),
                        params![id],
                        rule_from_row,
                    )?;
                    debug!(rule_id = rule.id, "Promotion created a new rule");
                    Ok(PromotionOutcome::Created(rule))
                }
            }
        })();

        match result {
            Ok(outcome) => {
                conn.execute("COMMIT", [])?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Deactivate a rule. Rules are never hard-deleted: the row stays for
    /// audit, it just stops matching.
    pub fn deactivate_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("UPDATE rules SET active = 0 WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Rule {}", id)));
        }
        Ok(())
    }

    /// Count active rules per pack, for status output
    pub fn count_rules_by_pack(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT pack, COUNT(*) FROM rules WHERE active = 1 GROUP BY pack ORDER BY pack",
        )?;

        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}
