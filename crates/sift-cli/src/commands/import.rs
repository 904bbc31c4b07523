//! Import command implementation

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use sift_core::ingest::import_csv;

use super::{open_db, run_categorization};

pub async fn cmd_import(
    db_path: &Path,
    file: &Path,
    no_categorize: bool,
    no_llm: bool,
    threshold: f64,
    no_encrypt: bool,
) -> Result<()> {
    println!("📥 Importing {}...", file.display());

    let db = open_db(db_path, no_encrypt)?;

    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let result = import_csv(&db, csv_file)?;

    println!("✅ Import complete!");
    println!("   Imported: {}", result.imported);
    println!("   Skipped (duplicates): {}", result.duplicates);

    // Categorize what just landed (unless --no-categorize)
    if result.imported > 0 && !no_categorize {
        println!();
        run_categorization(&db, None, no_llm, threshold).await?;
    }

    Ok(())
}
