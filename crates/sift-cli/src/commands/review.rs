//! Review queue commands
//!
//! `review` lists what is waiting; `review apply` records the user's decision,
//! optionally promoting it into a rule so the next import handles the merchant
//! without asking again.

use anyhow::{Context, Result};
use sift_core::{
    db::Database,
    models::{PromotionOutcome, Rule},
    promote::Promoter,
};

use super::truncate;

pub fn cmd_review_list(db: &Database, limit: i64) -> Result<()> {
    let queue = db.list_review_queue(limit)?;

    if queue.is_empty() {
        println!("✅ Review queue is empty.");
        return Ok(());
    }

    let total = db.count_review_queue()?;

    println!();
    println!("📋 Review Queue ({} waiting)", total);
    println!("   ──────────────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:10} │ {:>10} │ {:22} │ {}",
        "ID", "Date", "Amount", "Merchant", "Suggestion"
    );
    println!("   ─────┼────────────┼────────────┼────────────────────────┼──────────────");

    for tx in queue {
        let merchant = match &tx.detail {
            Some(detail) => format!("{} / {}", tx.merchant, detail),
            None => tx.merchant.clone(),
        };

        let suggestion = match (&tx.category, tx.tag_confidence) {
            (Some(category), Some(conf)) => {
                format!("{} ({:.0}%)", target_label(category, tx.subcategory.as_deref()), conf * 100.0)
            }
            _ => "(none)".to_string(),
        };

        let amount = if tx.amount < 0.0 {
            format!("\x1b[31m${:.2}\x1b[0m", tx.amount.abs())
        } else {
            format!("\x1b[32m+${:.2}\x1b[0m", tx.amount)
        };

        println!(
            "   {:>4} │ {} │ {:>10} │ {:22} │ {}",
            tx.id,
            tx.date,
            amount,
            truncate(&merchant, 22),
            suggestion
        );
    }

    println!();
    println!("Apply a decision with:");
    println!("  sift review apply --id <ID> --category <NAME> [--subcategory <NAME>] [--promote]");

    Ok(())
}

pub fn cmd_review_apply(
    db: &Database,
    id: i64,
    category: &str,
    subcategory: Option<&str>,
    promote: bool,
    overwrite: bool,
) -> Result<()> {
    let tx = db
        .get_transaction(id)
        .with_context(|| format!("Transaction #{} not found", id))?;

    if promote {
        let promoter = Promoter::new(db);
        let (outcome, updated) = promoter.promote(&tx, category, subcategory, None, overwrite)?;

        println!(
            "✅ Transaction #{} ({}) categorized as {}",
            id,
            updated.merchant,
            target_label(category, subcategory)
        );

        match outcome {
            PromotionOutcome::Created(rule) => {
                println!("📌 Created rule #{}: {}", rule.id, match_label(&rule));
            }
            PromotionOutcome::Duplicate { existing } => {
                println!(
                    "📌 Rule #{} already covers this match (target: {})",
                    existing.id,
                    target_label(&existing.category, existing.subcategory.as_deref())
                );
                println!("   Re-run with --overwrite to retarget it.");
            }
            PromotionOutcome::Retargeted(rule) => {
                println!(
                    "📌 Retargeted rule #{} to {}",
                    rule.id,
                    target_label(&rule.category, rule.subcategory.as_deref())
                );
            }
        }
    } else {
        let taxonomy = db.load_taxonomy()?;
        let updated = db.apply_review(id, category, subcategory, &taxonomy)?;
        println!(
            "✅ Transaction #{} ({}) categorized as {}",
            id,
            updated.merchant,
            target_label(category, subcategory)
        );
    }

    Ok(())
}

fn target_label(category: &str, subcategory: Option<&str>) -> String {
    match subcategory {
        Some(sub) => format!("{}/{}", category, sub),
        None => category.to_string(),
    }
}

fn match_label(rule: &Rule) -> String {
    match &rule.match_detail {
        Some(detail) => format!(
            "{} \"{}\" + \"{}\" → {}",
            rule.match_type.as_str(),
            rule.match_value,
            detail,
            target_label(&rule.category, rule.subcategory.as_deref())
        ),
        None => format!(
            "{} \"{}\" → {}",
            rule.match_type.as_str(),
            rule.match_value,
            target_label(&rule.category, rule.subcategory.as_deref())
        ),
    }
}
