//! Rule management commands

use anyhow::Result;
use sift_core::{
    db::Database,
    matcher::RuleMatcher,
    models::{MatchType, NewRule, PriorityTiers, RulePack},
    Error,
};

use super::truncate;

pub fn cmd_rules_list(db: &Database, include_inactive: bool) -> Result<()> {
    let rules = db.list_rules(include_inactive)?;

    if rules.is_empty() {
        println!("No rules yet. Add one with:");
        println!("  sift rules add --merchant <VALUE> --category <NAME>");
        return Ok(());
    }

    println!();
    println!("📋 Categorization Rules ({})", rules.len());
    println!("   ──────────────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:>4} │ {:8} │ {:26} │ {}",
        "ID", "Pri", "Type", "Match", "Target"
    );
    println!("   ─────┼──────┼──────────┼────────────────────────────┼──────────────");

    for rule in rules {
        let matched = match &rule.match_detail {
            Some(detail) => format!("{} / {}", rule.match_value, detail),
            None => rule.match_value.clone(),
        };
        let target = match &rule.subcategory {
            Some(sub) => format!("{}/{}", rule.category, sub),
            None => rule.category.clone(),
        };
        let suffix = if rule.active { "" } else { " (inactive)" };

        println!(
            "   {:>4} │ {:>4} │ {:8} │ {:26} │ {}{}",
            rule.id,
            rule.priority,
            rule.match_type.as_str(),
            truncate(&matched, 26),
            target,
            suffix
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_rules_add(
    db: &Database,
    merchant: &str,
    detail: Option<&str>,
    match_type_str: &str,
    category: &str,
    subcategory: Option<&str>,
    pack_str: &str,
    priority: Option<i64>,
    notes: Option<&str>,
) -> Result<()> {
    let match_type: MatchType = match_type_str.parse().map_err(|_| {
        anyhow::anyhow!(
            "Unknown match type: {} (use exact, contains, prefix, pattern)",
            match_type_str
        )
    })?;
    let pack: RulePack = pack_str.parse().map_err(|_| {
        anyhow::anyhow!(
            "Unknown rule pack: {} (use manual, composite-learned, learned, system)",
            pack_str
        )
    })?;

    let taxonomy = db.load_taxonomy()?;
    let new_rule = NewRule {
        pack,
        priority,
        match_type,
        match_value: merchant.to_string(),
        match_detail: detail.map(|d| d.to_string()),
        category: category.to_string(),
        subcategory: subcategory.map(|s| s.to_string()),
        created_by: Some("cli".to_string()),
        notes: notes.map(|n| n.to_string()),
    };

    match db.insert_rule(&new_rule, &taxonomy, &PriorityTiers::default()) {
        Ok(rule) => {
            println!(
                "✅ Created rule #{} (priority {}, pack {})",
                rule.id,
                rule.priority,
                rule.pack.as_str()
            );
        }
        Err(Error::DuplicateRule { existing_id }) => {
            println!(
                "⚠️  An equivalent active rule already exists: #{}",
                existing_id
            );
            println!("   Deactivate it first with 'sift rules delete --id {}'", existing_id);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

pub fn cmd_rules_delete(db: &Database, id: i64) -> Result<()> {
    db.deactivate_rule(id)?;
    println!("✅ Deactivated rule #{}", id);
    Ok(())
}

pub fn cmd_rules_test(db: &Database, merchant: &str, detail: Option<&str>) -> Result<()> {
    let matcher = RuleMatcher::new(db.load_active_rules()?);

    let label = match detail {
        Some(d) => format!("{} / {}", merchant, d),
        None => merchant.to_string(),
    };
    println!("🔍 Testing matcher against: {}", label);

    let candidates = matcher.matching_rules(merchant, detail);
    if candidates.is_empty() {
        println!("   No rules match.");
        return Ok(());
    }

    let winner_id = matcher
        .match_transaction(merchant, detail)
        .map(|r| r.id);

    println!();
    for rule in candidates {
        let target = match &rule.subcategory {
            Some(sub) => format!("{}/{}", rule.category, sub),
            None => rule.category.clone(),
        };
        let marker = if Some(rule.id) == winner_id {
            "★"
        } else {
            " "
        };
        println!(
            "   {} #{:<4} priority {:>3} {:8} → {}",
            marker,
            rule.id,
            rule.priority,
            rule.match_type.as_str(),
            target
        );
    }

    println!();
    println!("★ marks the rule the categorizer would apply.");

    Ok(())
}
