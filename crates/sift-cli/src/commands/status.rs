//! Status and taxonomy listing commands

use std::path::Path;

use anyhow::Result;
use sift_core::db::Database;

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use sift_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Sift Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Try to open the database and show stats
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                println!();
                println!("   Transactions: {}", db.count_transactions()?);
                println!("   Review queue: {}", db.count_review_queue()?);

                let by_pack = db.count_rules_by_pack()?;
                if by_pack.is_empty() {
                    println!("   Active rules: 0");
                } else {
                    println!("   Active rules:");
                    for (pack, count) in by_pack {
                        println!("     {:18} {}", pack, count);
                    }
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_taxonomy(db: &Database) -> Result<()> {
    let taxonomy = db.load_taxonomy()?;

    println!();
    println!("🗂️  Category Taxonomy");
    println!("   ─────────────────────────────────────────────────────────────");

    for category in taxonomy.categories() {
        let kind = if category.is_income {
            " (income)"
        } else if category.is_transfer {
            " (transfers)"
        } else {
            ""
        };
        println!("   {}{}", category.name, kind);
        if !category.subcategories.is_empty() {
            println!("     {}", category.subcategories.join(", "));
        }
    }

    println!();
    Ok(())
}
