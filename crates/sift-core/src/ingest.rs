//! CSV ingest
//!
//! One fixed layout: `date,description,merchant,detail,amount`. The merchant
//! and detail columns arrive pre-normalized from whatever produced the file;
//! ingest trims and upper-cases them, hashes each row for deduplication, and
//! nothing more. Bank-specific export formats are out of scope.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::db::{Database, TransactionInsertResult};
use crate::error::{Error, Result};
use crate::models::NewTransaction;

/// Merchant recorded when the merchant column is blank
pub const UNKNOWN_MERCHANT: &str = "UNKNOWN";

/// Outcome of one import run
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates: usize,
}

/// Convert a CSV record to a JSON object using headers as keys
fn record_to_json(headers: &StringRecord, record: &StringRecord) -> String {
    let mut map = serde_json::Map::new();
    for (i, header) in headers.iter().enumerate() {
        if let Some(value) = record.get(i) {
            map.insert(header.to_string(), Value::String(value.to_string()));
        }
    }
    json!(map).to_string()
}

/// Dedup hash over the identity fields. Merchant/detail are derived columns
/// and deliberately left out: re-normalizing an old file must not re-import it.
fn generate_hash(date: &NaiveDate, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_token(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Parse the fixed `date,description,merchant,detail,amount` layout
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<NewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut transactions = Vec::new();

    for result in rdr.records() {
        let record = result?;

        let original_data = Some(record_to_json(&headers, &record));

        let date_str = record
            .get(0)
            .ok_or_else(|| Error::Import("Missing date".into()))?;
        let date = parse_date(date_str)?;

        let description = record
            .get(1)
            .ok_or_else(|| Error::Import("Missing description".into()))?
            .trim()
            .to_string();

        let merchant = match record.get(2).map(normalize_token) {
            Some(m) if !m.is_empty() => m,
            _ => UNKNOWN_MERCHANT.to_string(),
        };

        let detail = record
            .get(3)
            .map(normalize_token)
            .filter(|d| !d.is_empty());

        let amount_str = record
            .get(4)
            .ok_or_else(|| Error::Import("Missing amount".into()))?;
        let amount = parse_amount(amount_str)?;

        let import_hash = generate_hash(&date, &description, amount);

        transactions.push(NewTransaction {
            date,
            description,
            merchant,
            detail,
            amount,
            import_hash,
            original_data,
        });
    }

    debug!("Parsed {} transactions", transactions.len());
    Ok(transactions)
}

/// Insert parsed transactions, skipping rows whose hash is already stored
pub fn import_transactions(
    db: &Database,
    transactions: &[NewTransaction],
) -> Result<ImportResult> {
    let mut result = ImportResult::default();
    for tx in transactions {
        match db.insert_transaction(tx)? {
            TransactionInsertResult::Inserted(_) => result.imported += 1,
            TransactionInsertResult::Duplicate(_) => result.duplicates += 1,
        }
    }
    debug!(
        "Imported {} transactions ({} duplicates skipped)",
        result.imported, result.duplicates
    );
    Ok(result)
}

/// Parse and import in one step
pub fn import_csv<R: Read>(db: &Database, reader: R) -> Result<ImportResult> {
    let transactions = parse_csv(reader)?;
    import_transactions(db, &transactions)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, commas, and
/// parenthesized negatives
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,description,merchant,detail,amount
2024-03-01,SQ *BREADS BAKERY,sq,breads bakery,-8.50
2024-03-02,AMAZON.COM*1X2Y3,AMAZON,,-42.10
2024-03-03,CHECK 1042,,,-150.00
";

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date("01/15/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date(" 01/15/24 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(parse_date("not a date").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("-8.50").unwrap(), -8.50);
        assert_eq!(parse_amount("$1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("(25.00)").unwrap(), -25.00);
        assert!(parse_amount("eight").is_err());
    }

    #[test]
    fn test_parse_fixed_layout() {
        let transactions = parse_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(transactions.len(), 3);

        // Merchant and detail are trimmed and upper-cased
        assert_eq!(transactions[0].merchant, "SQ");
        assert_eq!(transactions[0].detail.as_deref(), Some("BREADS BAKERY"));
        assert_eq!(transactions[0].amount, -8.50);

        // Empty detail becomes absent
        assert_eq!(transactions[1].merchant, "AMAZON");
        assert!(transactions[1].detail.is_none());

        // Empty merchant falls back to UNKNOWN
        assert_eq!(transactions[2].merchant, UNKNOWN_MERCHANT);

        // Raw row is preserved for audit
        let raw = transactions[0].original_data.as_deref().unwrap();
        assert!(raw.contains("SQ *BREADS BAKERY"));
    }

    #[test]
    fn test_short_record_is_an_error() {
        let csv = "date,description,merchant,detail,amount\n2024-03-01,COFFEE\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Missing amount"));
    }

    #[test]
    fn test_hash_ignores_derived_columns() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let a = generate_hash(&date, "SQ *BREADS BAKERY", -8.50);
        let b = generate_hash(&date, "SQ *BREADS BAKERY", -8.50);
        let c = generate_hash(&date, "SQ *BREADS BAKERY", -9.50);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_import_skips_duplicates() {
        let db = Database::in_memory().unwrap();
        db.seed_taxonomy().unwrap();

        let first = import_csv(&db, SAMPLE.as_bytes()).unwrap();
        assert_eq!(first.imported, 3);
        assert_eq!(first.duplicates, 0);

        // The same file again is a no-op
        let second = import_csv(&db, SAMPLE.as_bytes()).unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.duplicates, 3);

        assert_eq!(db.count_transactions().unwrap(), 3);
    }
}
