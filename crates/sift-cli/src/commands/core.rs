//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `build_ai` - Resolve the LLM fallback from the environment
//! - `cmd_init` - Initialize the database and seed the taxonomy

use std::path::Path;

use anyhow::{Context, Result};
use sift_core::{ai::AiClient, db::Database, models::PriorityTiers};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_str().unwrap();
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Resolve the LLM fallback from the environment, honoring --no-llm
pub fn build_ai(no_llm: bool) -> Option<AiClient> {
    if no_llm {
        return None;
    }

    let ai = AiClient::from_env();
    if ai.is_none() {
        println!("   💡 Tip: Set OLLAMA_HOST to enable the LLM fallback");
    }
    ai
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    // Seed the category taxonomy and starter rules
    db.seed_taxonomy().context("Failed to seed taxonomy")?;
    println!("   Seeded category taxonomy");

    let created = db
        .seed_starter_rules(&PriorityTiers::default())
        .context("Failed to seed starter rules")?;
    if created > 0 {
        println!("   Seeded {} starter rules", created);
    }

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: sift import --file statement.csv");
    println!("  2. Work the review queue: sift review");

    Ok(())
}
