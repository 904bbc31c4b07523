//! Pattern learner command

use anyhow::Result;
use sift_core::{db::Database, learn::PatternLearner};

pub fn cmd_learn(db: &Database, min_occurrences: usize, min_consistency: f64) -> Result<()> {
    println!("🧠 Mining confirmed history for stable merchant patterns...");
    println!(
        "   Gates: {} sightings, {:.0}% agreement",
        min_occurrences,
        min_consistency * 100.0
    );

    let report = PatternLearner::new(db)
        .with_thresholds(min_occurrences, min_consistency)
        .learn()?;

    println!();
    println!("📊 Learning Results");
    println!("   ─────────────────────────────");
    println!("   Candidates: {}", report.candidates);
    println!("   Rules created: {}", report.created);
    println!("   Already covered: {}", report.skipped_existing);
    println!("   Below consistency: {}", report.below_consistency);

    if report.created > 0 {
        println!();
        println!(
            "✅ {} new rules. Inspect them with 'sift rules'.",
            report.created
        );
    } else {
        println!();
        println!("✅ Nothing new to learn.");
    }

    Ok(())
}
