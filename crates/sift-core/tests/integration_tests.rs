//! Integration tests for sift-core
//!
//! These tests exercise the full import → categorize → review → promote
//! loop, including the real HTTP path against a mock Ollama server.

use sift_core::{
    ai::AiClient,
    categorize::{Categorizer, DEFAULT_REVIEW_THRESHOLD},
    db::Database,
    ingest::import_csv,
    learn::PatternLearner,
    models::{MatchType, NewRule, PriorityTiers, RulePack, TagSource, Transaction},
    promote::Promoter,
    test_utils::MockOllamaServer,
    MockBackend, OllamaBackend, PromotionOutcome,
};

/// Fixed-layout sample: one composite-rule candidate, one ambiguous Square
/// merchant, one plain retailer
fn sample_csv() -> &'static str {
    "date,description,merchant,detail,amount
2024-03-01,SQ *BREADS BAKERY,SQ,BREADS BAKERY,-8.50
2024-03-02,SQ *ARATA SUSHI,SQ,ARATA SUSHI,-64.20
2024-03-03,AMAZON.COM*ORDER,AMAZON,,-42.10
"
}

fn seeded_db() -> Database {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    db.seed_taxonomy().expect("Failed to seed taxonomy");
    db
}

fn find_tx<'a>(
    transactions: &'a [Transaction],
    detail: Option<&str>,
    merchant: &str,
) -> &'a Transaction {
    transactions
        .iter()
        .find(|t| t.merchant == merchant && t.detail.as_deref() == detail)
        .unwrap_or_else(|| panic!("No transaction for {} / {:?}", merchant, detail))
}

// =============================================================================
// Import
// =============================================================================

#[test]
fn test_full_import_workflow() {
    let db = seeded_db();

    let result = import_csv(&db, sample_csv().as_bytes()).expect("Import failed");
    assert_eq!(result.imported, 3);
    assert_eq!(result.duplicates, 0);

    // Importing the same file again skips every row
    let again = import_csv(&db, sample_csv().as_bytes()).expect("Re-import failed");
    assert_eq!(again.imported, 0);
    assert_eq!(again.duplicates, 3);

    assert_eq!(db.count_transactions().unwrap(), 3);
    assert_eq!(db.list_uncategorized(None).unwrap().len(), 3);
}

// =============================================================================
// Categorization
// =============================================================================

#[tokio::test]
async fn test_rule_match_and_review_queue_without_llm() {
    let db = seeded_db();
    let taxonomy = db.load_taxonomy().unwrap();
    let tiers = PriorityTiers::default();

    // Composite rule at the composite tier for the bakery behind Square
    db.insert_rule(
        &NewRule {
            pack: RulePack::CompositeLearned,
            priority: Some(50),
            match_type: MatchType::Exact,
            match_value: "SQ".to_string(),
            match_detail: Some("BREADS BAKERY".to_string()),
            category: "Food & Drink".to_string(),
            subcategory: Some("Coffee".to_string()),
            created_by: None,
            notes: None,
        },
        &taxonomy,
        &tiers,
    )
    .unwrap();

    import_csv(&db, sample_csv().as_bytes()).unwrap();

    let categorizer = Categorizer::for_database(&db, None, DEFAULT_REVIEW_THRESHOLD).unwrap();
    let outcome = categorizer.categorize_batch(&db, None).await.unwrap();

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.rule_matched, 1);
    assert_eq!(outcome.unresolved, 2);
    assert_eq!(outcome.needs_review, 2);

    let transactions = db.list_transactions(100).unwrap();

    // The composite rule resolved the bakery with full confidence
    let bakery = find_tx(&transactions, Some("BREADS BAKERY"), "SQ");
    assert_eq!(bakery.category.as_deref(), Some("Food & Drink"));
    assert_eq!(bakery.subcategory.as_deref(), Some("Coffee"));
    assert_eq!(bakery.tag_source, Some(TagSource::Rule));
    assert_eq!(bakery.tag_confidence, Some(1.0));
    assert!(!bakery.needs_review);
    assert!(bakery.matched_rule_id.is_some());

    // Same merchant, different counterparty: no rule, no LLM, so review
    let sushi = find_tx(&transactions, Some("ARATA SUSHI"), "SQ");
    assert!(sushi.category.is_none());
    assert!(sushi.tag_source.is_none());
    assert!(sushi.needs_review);

    assert_eq!(db.count_review_queue().unwrap(), 2);
}

#[tokio::test]
async fn test_threshold_gating_over_http() {
    let db = seeded_db();
    import_csv(&db, sample_csv().as_bytes()).unwrap();

    let server = MockOllamaServer::start().await;
    let ai = AiClient::Ollama(OllamaBackend::new(&server.url(), "test-model"));

    let categorizer = Categorizer::for_database(&db, Some(&ai), DEFAULT_REVIEW_THRESHOLD).unwrap();
    let outcome = categorizer.categorize_batch(&db, None).await.unwrap();

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.llm_suggested, 3);

    let transactions = db.list_transactions(100).unwrap();

    // 0.95 clears the 0.90 threshold
    let bakery = find_tx(&transactions, Some("BREADS BAKERY"), "SQ");
    assert_eq!(bakery.tag_source, Some(TagSource::Llm));
    assert_eq!(bakery.category.as_deref(), Some("Food & Drink"));
    assert!(!bakery.needs_review);

    // 0.72 does not
    let sushi = find_tx(&transactions, Some("ARATA SUSHI"), "SQ");
    assert_eq!(sushi.tag_source, Some(TagSource::Llm));
    assert!(sushi.needs_review);
    assert!(sushi.tag_confidence.unwrap() < DEFAULT_REVIEW_THRESHOLD);

    // The suggestion's reasoning is kept for the review screen
    assert!(sushi.rationale.is_some());
}

#[tokio::test]
async fn test_graceful_degradation_when_llm_always_fails() {
    let db = seeded_db();
    import_csv(&db, sample_csv().as_bytes()).unwrap();

    let ai = AiClient::Mock(MockBackend::unhealthy());
    let categorizer = Categorizer::for_database(&db, Some(&ai), DEFAULT_REVIEW_THRESHOLD).unwrap();

    // The whole batch completes; every row degrades to review, none abort
    let outcome = categorizer.categorize_batch(&db, None).await.unwrap();
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.unresolved, 3);
    assert_eq!(outcome.needs_review, 3);
    assert_eq!(outcome.rule_matched, 0);

    assert_eq!(db.count_review_queue().unwrap(), 3);
    for tx in db.list_review_queue(100).unwrap() {
        assert!(tx.category.is_none());
        assert!(tx.needs_review);
    }
}

// =============================================================================
// Promotion Loop
// =============================================================================

#[tokio::test]
async fn test_promote_then_next_run_matches() {
    let db = seeded_db();

    import_csv(
        &db,
        "date,description,merchant,detail,amount
2024-03-04,SQ *BLUE BOTTLE,SQ,BLUE BOTTLE COFFEE,-6.25
"
        .as_bytes(),
    )
    .unwrap();
    let first = &db.list_uncategorized(None).unwrap()[0];

    // The user files it under coffee and asks for a rule
    let promoter = Promoter::new(&db);
    let (outcome, updated) = promoter
        .promote(first, "Food & Drink", Some("Coffee"), None, false)
        .unwrap();
    let rule = match outcome {
        PromotionOutcome::Created(rule) => rule,
        other => panic!("Expected Created, got {:?}", other),
    };
    assert_eq!(rule.priority, 50);
    assert_eq!(rule.match_detail.as_deref(), Some("BLUE BOTTLE COFFEE"));
    assert_eq!(updated.tag_source, Some(TagSource::Manual));

    // Promoting the same decision again does not mint a second rule
    let (second, _) = promoter
        .promote(first, "Food & Drink", Some("Coffee"), None, false)
        .unwrap();
    assert!(matches!(second, PromotionOutcome::Duplicate { .. }));
    assert_eq!(db.load_active_rules().unwrap().len(), 1);

    // Next month's visit hits the promoted rule without any LLM
    import_csv(
        &db,
        "date,description,merchant,detail,amount
2024-04-04,SQ *BLUE BOTTLE,SQ,BLUE BOTTLE COFFEE,-6.25
"
        .as_bytes(),
    )
    .unwrap();

    let categorizer = Categorizer::for_database(&db, None, DEFAULT_REVIEW_THRESHOLD).unwrap();
    let outcome = categorizer.categorize_batch(&db, None).await.unwrap();
    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.rule_matched, 1);

    let transactions = db.list_transactions(100).unwrap();
    let next = transactions
        .iter()
        .find(|t| t.tag_source == Some(TagSource::Rule))
        .expect("promoted rule should have matched");
    assert_eq!(next.matched_rule_id, Some(rule.id));
    assert_eq!(next.category.as_deref(), Some("Food & Drink"));
}

#[tokio::test]
async fn test_starter_rules_cover_recurring_payments() {
    let db = seeded_db();
    let created = db
        .seed_starter_rules(&PriorityTiers::default())
        .expect("Failed to seed starter rules");
    assert_eq!(created, 3);

    import_csv(
        &db,
        "date,description,merchant,detail,amount
2024-03-08,Zelle payment to Devi Daycare,ZELLE TO,DEVI DAYCARE,-425.00
"
        .as_bytes(),
    )
    .unwrap();

    let categorizer = Categorizer::for_database(&db, None, DEFAULT_REVIEW_THRESHOLD).unwrap();
    let outcome = categorizer.categorize_batch(&db, None).await.unwrap();
    assert_eq!(outcome.rule_matched, 1);

    let transactions = db.list_transactions(100).unwrap();
    let daycare = find_tx(&transactions, Some("DEVI DAYCARE"), "ZELLE TO");
    assert_eq!(daycare.category.as_deref(), Some("Baby"));
    assert_eq!(daycare.subcategory.as_deref(), Some("Daycare"));
    assert!(!daycare.needs_review);
}

// =============================================================================
// Learning Loop
// =============================================================================

#[tokio::test]
async fn test_learner_turns_history_into_rules() {
    let db = seeded_db();
    let taxonomy = db.load_taxonomy().unwrap();

    import_csv(
        &db,
        "date,description,merchant,detail,amount
2024-01-05,SQ *BREADS BAKERY,SQ,BREADS BAKERY,-8.50
2024-01-12,SQ *BREADS BAKERY,SQ,BREADS BAKERY,-9.25
2024-01-19,SQ *BREADS BAKERY,SQ,BREADS BAKERY,-7.75
"
        .as_bytes(),
    )
    .unwrap();

    // The user answers the review queue the same way three times
    for tx in db.list_uncategorized(None).unwrap() {
        db.apply_review(tx.id, "Food & Drink", Some("Coffee"), &taxonomy)
            .unwrap();
    }

    let report = PatternLearner::new(&db).learn().unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.created, 1);

    // The fourth visit is categorized by the learned rule, no LLM involved
    import_csv(
        &db,
        "date,description,merchant,detail,amount
2024-02-02,SQ *BREADS BAKERY,SQ,BREADS BAKERY,-8.00
"
        .as_bytes(),
    )
    .unwrap();

    let categorizer = Categorizer::for_database(&db, None, DEFAULT_REVIEW_THRESHOLD).unwrap();
    let outcome = categorizer.categorize_batch(&db, None).await.unwrap();
    assert_eq!(outcome.rule_matched, 1);
    assert_eq!(outcome.unresolved, 0);
}
