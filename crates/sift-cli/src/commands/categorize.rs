//! Batch categorization command

use std::path::Path;

use anyhow::Result;
use sift_core::{ai::AiBackend, categorize::Categorizer, db::Database};

use super::{build_ai, open_db};

pub async fn cmd_categorize(
    db_path: &Path,
    limit: Option<i64>,
    no_llm: bool,
    threshold: f64,
    no_encrypt: bool,
) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;
    run_categorization(&db, limit, no_llm, threshold).await
}

/// The categorization pass shared by `categorize` and the post-import hook
pub async fn run_categorization(
    db: &Database,
    limit: Option<i64>,
    no_llm: bool,
    threshold: f64,
) -> Result<()> {
    println!("🏷️  Categorizing transactions...");

    let ai = build_ai(no_llm);
    match &ai {
        Some(client) => println!("   🤖 LLM fallback: {} at {}", client.model(), client.host()),
        None => println!("   LLM fallback disabled; unmatched transactions go to review"),
    }

    let categorizer = Categorizer::for_database(db, ai.as_ref(), threshold)?;
    println!("   Active rules: {}", categorizer.rule_count());

    let outcome = categorizer.categorize_batch(db, limit).await?;

    println!();
    println!("📊 Categorization Results");
    println!("   ─────────────────────────────");
    println!("   Processed: {}", outcome.total);
    println!("   By rule: {}", outcome.rule_matched);
    println!("   By LLM: {}", outcome.llm_suggested);
    println!("   Unresolved: {}", outcome.unresolved);
    println!("   High confidence: {}", outcome.high_confidence);

    println!();
    if outcome.needs_review > 0 {
        println!(
            "⚠️  {} transactions need review. Run 'sift review' to see them.",
            outcome.needs_review
        );
    } else if outcome.total > 0 {
        println!("✅ Everything categorized with confidence.");
    } else {
        println!("✅ Nothing to categorize.");
    }

    Ok(())
}
