//! Sift CLI - Rule-first transaction categorizer
//!
//! Usage:
//!   sift init                      Initialize database
//!   sift import --file CSV         Import and categorize transactions
//!   sift review                    List transactions waiting for review
//!   sift rules test --merchant M   Dry-run the matcher

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import {
            file,
            no_categorize,
            no_llm,
            threshold,
        } => {
            commands::cmd_import(
                &cli.db,
                &file,
                no_categorize,
                no_llm,
                threshold,
                cli.no_encrypt,
            )
            .await
        }
        Commands::Categorize {
            limit,
            no_llm,
            threshold,
        } => commands::cmd_categorize(&cli.db, limit, no_llm, threshold, cli.no_encrypt).await,
        Commands::Review { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_review_list(&db, 20),
                Some(ReviewAction::List { limit }) => commands::cmd_review_list(&db, limit),
                Some(ReviewAction::Apply {
                    id,
                    category,
                    subcategory,
                    promote,
                    overwrite,
                }) => commands::cmd_review_apply(
                    &db,
                    id,
                    &category,
                    subcategory.as_deref(),
                    promote,
                    overwrite,
                ),
            }
        }
        Commands::Rules { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_rules_list(&db, false),
                Some(RulesAction::List { all }) => commands::cmd_rules_list(&db, all),
                Some(RulesAction::Add {
                    merchant,
                    detail,
                    match_type,
                    category,
                    subcategory,
                    pack,
                    priority,
                    notes,
                }) => commands::cmd_rules_add(
                    &db,
                    &merchant,
                    detail.as_deref(),
                    &match_type,
                    &category,
                    subcategory.as_deref(),
                    &pack,
                    priority,
                    notes.as_deref(),
                ),
                Some(RulesAction::Delete { id }) => commands::cmd_rules_delete(&db, id),
                Some(RulesAction::Test { merchant, detail }) => {
                    commands::cmd_rules_test(&db, &merchant, detail.as_deref())
                }
            }
        }
        Commands::Learn {
            min_occurrences,
            min_consistency,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_learn(&db, min_occurrences, min_consistency)
        }
        Commands::Taxonomy => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_taxonomy(&db)
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
    }
}
