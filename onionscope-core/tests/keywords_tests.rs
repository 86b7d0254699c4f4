// Tests for keyword table loading and detection

use onionscope_core::error::LoadError;
use onionscope_core::keywords::{KeywordMatcher, KeywordTable};
use std::fs;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn matcher(csv: &str) -> KeywordMatcher {
    KeywordMatcher::new(KeywordTable::from_csv_str(csv).unwrap(), 80)
}

// ============================================================================
// Table Loading Tests
// ============================================================================

#[test]
fn test_load_two_column_table() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(
        &temp_dir,
        "keywords.csv",
        "keyword,category\nCocaine,Drugs\nRifle,Weapons\nheroin,Drugs\n",
    );

    let table = KeywordTable::load(&path).unwrap();
    assert_eq!(table.keyword_count(), 3);
    assert_eq!(
        table.keywords("Drugs").unwrap(),
        &["cocaine".to_string(), "heroin".to_string()]
    );
    assert_eq!(table.keywords("Weapons").unwrap(), &["rifle".to_string()]);
}

#[test]
fn test_load_column_order_does_not_matter() {
    let table = KeywordTable::from_csv_str("Category,Keyword\nDrugs,LSD\n").unwrap();
    assert_eq!(table.keywords("Drugs").unwrap(), &["lsd".to_string()]);
}

#[test]
fn test_load_wide_table() {
    let table = KeywordTable::from_csv_str(
        "Drugs,Weapons,Hacking\ncocaine,rifle,botnet\nheroin,,rootkit\n,grenade,\n",
    )
    .unwrap();

    assert_eq!(table.keywords("Drugs").unwrap().len(), 2);
    assert_eq!(
        table.keywords("Weapons").unwrap(),
        &["rifle".to_string(), "grenade".to_string()]
    );
    assert_eq!(table.keywords("Hacking").unwrap().len(), 2);
}

#[test]
fn test_load_ignores_blank_cells() {
    let table = KeywordTable::from_csv_str("keyword,category\n,Drugs\nheroin,\n  ,  \nmeth,Drugs\n")
        .unwrap();
    assert_eq!(table.keyword_count(), 1);
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = KeywordTable::load(&temp_dir.path().join("nope.csv"));
    assert!(matches!(result, Err(LoadError::NotFound(_))));
}

#[test]
fn test_load_header_only_is_empty() {
    let result = KeywordTable::from_csv_str("keyword,category\n");
    assert!(matches!(result, Err(LoadError::Empty)));
}

#[test]
fn test_duplicate_keywords_collapse() {
    let table = KeywordTable::from_csv_str("keyword,category\nmeth,Drugs\nMETH,Drugs\n").unwrap();
    assert_eq!(table.keyword_count(), 1);
}

// ============================================================================
// Detection Tests
// ============================================================================

#[test]
fn test_exact_match_scores_100() {
    let matcher = matcher("keyword,category\ncocaine,Drugs\n");
    let matches = matcher.detect("They sell COCAINE by the gram.");

    let drugs = &matches["Drugs"];
    assert_eq!(drugs.len(), 1);
    assert_eq!(drugs[0].keyword, "cocaine");
    assert_eq!(drugs[0].score, 100);
}

#[test]
fn test_exact_match_ignores_fuzzy_threshold() {
    let table = KeywordTable::from_csv_str("keyword,category\ncocaine,Drugs\n").unwrap();
    for threshold in [0, 80, 100] {
        let matcher = KeywordMatcher::new(table.clone(), threshold);
        let matches = matcher.detect("cocaine");
        assert_eq!(matches["Drugs"][0].score, 100);
    }
}

#[test]
fn test_exact_match_through_punctuation() {
    let matcher = matcher("keyword,category\ncredit card,Financial_Fraud\n");
    let matches = matcher.detect("Fresh credit-card dumps, daily!");
    assert_eq!(matches["Financial_Fraud"][0].score, 100);
}

#[test]
fn test_fuzzy_single_word() {
    let matcher = matcher("keyword,category\nmarijuana,Drugs\n");
    let matches = matcher.detect("the best marijuanna in town");

    let found = &matches["Drugs"][0];
    assert!(found.score >= 80, "score was {}", found.score);
    assert!(found.score < 100);
}

#[test]
fn test_fuzzy_multi_word_ignores_order() {
    let matcher = matcher("keyword,category\ncredit card dumps,Financial_Fraud\n");
    let matches = matcher.detect("dumps of every credit card you want");
    assert_eq!(matches["Financial_Fraud"][0].score, 100);
}

#[test]
fn test_below_threshold_is_dropped() {
    let matcher = matcher("keyword,category\nheroin,Drugs\n");
    assert!(matcher.detect("hello world").is_empty());
}

#[test]
fn test_empty_text_detects_nothing() {
    let matcher = matcher("keyword,category\nheroin,Drugs\n");
    assert!(matcher.detect("   ").is_empty());
}

#[test]
fn test_context_is_best_sentence() {
    let matcher = matcher("keyword,category\ncocaine,Drugs\n");
    let matches =
        matcher.detect("Welcome to the shop. We sell pure cocaine here! Contact us today.");
    assert_eq!(matches["Drugs"][0].context, "We sell pure cocaine here");
}

#[test]
fn test_detect_is_deterministic() {
    let matcher = KeywordMatcher::default();
    let text = "Buy a fake passport. Fresh fullz and cloned cards. Ransomware for rent.";
    assert_eq!(matcher.detect(text), matcher.detect(text));
}

// ============================================================================
// Reload Tests
// ============================================================================

#[test]
fn test_reload_replaces_table() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(&temp_dir, "new.csv", "keyword,category\nbotnet,Hacking\n");

    let mut matcher = matcher("keyword,category\ncocaine,Drugs\n");
    assert_eq!(matcher.reload(&path).unwrap(), 1);
    assert_eq!(matcher.categories(), vec!["Hacking"]);
    assert!(matcher.detect("cocaine").is_empty());
}

#[test]
fn test_failed_reload_keeps_previous_table() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(&temp_dir, "empty.csv", "keyword,category\n");

    let mut matcher = matcher("keyword,category\ncocaine,Drugs\n");
    assert!(matcher.reload(&path).is_err());
    assert!(matcher.reload(&temp_dir.path().join("missing.csv")).is_err());
    assert_eq!(matcher.categories(), vec!["Drugs"]);
    assert!(!matcher.detect("cocaine").is_empty());
}

#[test]
fn test_bundled_categories() {
    let matcher = KeywordMatcher::default();
    let categories = matcher.categories();
    for expected in ["Drugs", "Fake_IDs", "Financial_Fraud", "Hacking", "Human_Trafficking", "Weapons"] {
        assert!(categories.contains(&expected), "missing {expected}");
    }
}
