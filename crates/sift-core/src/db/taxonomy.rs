//! Taxonomy store: categories, subcategories, and the starter seed

use rusqlite::params;
use tracing::info;

use super::Database;
use crate::error::Result;
use crate::models::{MatchType, NewRule, PriorityTiers, RulePack, Taxonomy, TaxonomyCategory};

/// The household taxonomy seeded by `sift init`.
/// (name, display_order, is_income, is_transfer, subcategories)
const SEED_CATEGORIES: &[(&str, i64, bool, bool, &[&str])] = &[
    ("Food & Drink", 1, false, false, &["Coffee", "Restaurants", "Takeout", "Alcohol", "Snacks"]),
    ("Groceries", 2, false, false, &["Supermarket", "Farmers Market", "Specialty"]),
    ("Baby", 3, false, false, &["Daycare", "Supplies", "Clothes", "Medical"]),
    ("Home", 4, false, false, &["Rent", "Furniture", "Maintenance", "Supplies"]),
    ("Utilities", 5, false, false, &["Electric", "Gas", "Water", "Internet", "Phone"]),
    ("Transport", 6, false, false, &["Transit", "Rideshare", "Fuel", "Parking"]),
    ("Health", 7, false, false, &["Pharmacy", "Doctor", "Dental", "Fitness"]),
    ("Shopping", 8, false, false, &["Amazon", "Clothes", "Electronics", "Gifts"]),
    ("Subscriptions", 9, false, false, &["Streaming", "Software", "News"]),
    ("Entertainment", 10, false, false, &["Movies", "Events", "Hobbies"]),
    ("Travel", 11, false, false, &["Flights", "Lodging", "Activities"]),
    ("Income", 12, true, false, &["Salary", "Family Support", "Interest", "Refunds"]),
    ("Transfers", 13, false, true, &["Credit Card Payment", "Savings", "Venmo"]),
    ("Fees", 14, false, false, &["Bank Fees", "Interest Charges"]),
    ("Other", 15, false, false, &["Miscellaneous"]),
];

impl Database {
    /// Seed the taxonomy (idempotent - skips existing categories/subcategories)
    pub fn seed_taxonomy(&self) -> Result<()> {
        let conn = self.conn()?;

        for (name, display_order, is_income, is_transfer, subcategories) in SEED_CATEGORIES {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM taxonomy_categories WHERE name = ?",
                    params![name],
                    |_| Ok(true),
                )
                .unwrap_or(false);

            if !exists {
                conn.execute(
                    r#"
                    INSERT INTO taxonomy_categories (name, display_order, is_income, is_transfer)
                    VALUES (?, ?, ?, ?)
                    "#,
                    params![name, display_order, is_income, is_transfer],
                )?;
            }

            for sub in *subcategories {
                conn.execute(
                    r#"
                    INSERT OR IGNORE INTO taxonomy_subcategories (category, name)
                    VALUES (?, ?)
                    "#,
                    params![name, sub],
                )?;
            }
        }

        info!("Taxonomy seeded");
        Ok(())
    }

    /// Seed the starter rule pack (idempotent).
    ///
    /// These are the composite rules that motivated the two-level match key:
    /// shared payment processors (Zelle) where the processor token alone says
    /// nothing about the category.
    pub fn seed_starter_rules(&self, tiers: &PriorityTiers) -> Result<usize> {
        let taxonomy = self.load_taxonomy()?;

        let starters = [
            NewRule {
                pack: RulePack::Manual,
                priority: None,
                match_type: MatchType::Exact,
                match_value: "ZELLE TO".into(),
                match_detail: Some("DEVI DAYCARE".into()),
                category: "Baby".into(),
                subcategory: Some("Daycare".into()),
                created_by: Some("seed".into()),
                notes: Some("Daycare payments via Zelle".into()),
            },
            NewRule {
                pack: RulePack::Manual,
                priority: None,
                match_type: MatchType::Exact,
                match_value: "ZELLE FROM".into(),
                match_detail: Some("ROBERT DIENSTAG".into()),
                category: "Income".into(),
                subcategory: Some("Family Support".into()),
                created_by: Some("seed".into()),
                notes: Some("Weekly support payments".into()),
            },
            NewRule {
                pack: RulePack::Manual,
                priority: None,
                match_type: MatchType::Exact,
                match_value: "EAST PARK BEVERAGE".into(),
                match_detail: None,
                category: "Food & Drink".into(),
                subcategory: Some("Alcohol".into()),
                created_by: Some("seed".into()),
                notes: Some("Alcohol purchases".into()),
            },
        ];

        let mut created = 0;
        for rule in &starters {
            // promote_rule's duplicate check makes the seed re-runnable
            if self.promote_rule(rule, &taxonomy, tiers, false)?.created() {
                created += 1;
            }
        }

        if created > 0 {
            info!(created, "Starter rules seeded");
        }
        Ok(created)
    }

    /// Load the full taxonomy, categories in display order
    pub fn load_taxonomy(&self) -> Result<Taxonomy> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT name, display_order, is_income, is_transfer
            FROM taxonomy_categories
            ORDER BY display_order, name
            "#,
        )?;

        let mut categories = stmt
            .query_map([], |row| {
                Ok(TaxonomyCategory {
                    name: row.get(0)?,
                    display_order: row.get(1)?,
                    is_income: row.get(2)?,
                    is_transfer: row.get(3)?,
                    subcategories: Vec::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut sub_stmt = conn.prepare(
            "SELECT name FROM taxonomy_subcategories WHERE category = ? ORDER BY name",
        )?;
        for cat in &mut categories {
            let subs = sub_stmt
                .query_map(params![cat.name], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            cat.subcategories = subs;
        }

        Ok(Taxonomy::new(categories))
    }
}
