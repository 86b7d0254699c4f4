use onionscope::extract_url_path;
use onionscope::handlers::*;
use onionscope_core::config::CrawlConfig;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempDir};
use url::Url;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("http://abcdef.onion/market");
    assert_eq!(result, Some("http://abcdef.onion/market".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("abcdef.onion");
    assert_eq!(result, Some("http://abcdef.onion".to_string()));
}

#[test]
fn test_parse_url_line_with_port_without_scheme() {
    let result = parse_url_line("abcdef.onion:8080/x");
    assert_eq!(result, Some("http://abcdef.onion:8080/x".to_string()));
}

#[test]
fn test_parse_url_line_rejects_clearnet() {
    assert_eq!(parse_url_line("https://example.com"), None);
    assert_eq!(parse_url_line("example.com"), None);
}

#[test]
fn test_parse_url_line_skips_comments_and_invalid() {
    assert_eq!(parse_url_line("# seeds for today"), None);
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line("ftp://abcdef.onion/"), None);
}

#[test]
fn test_extract_url_path() {
    assert_eq!(extract_url_path("http://abcdef.onion/forum/t/1"), "/forum/t/1");
    assert_eq!(extract_url_path("http://abcdef.onion/"), "/");
    assert_eq!(extract_url_path("http://abcdef.onion"), "/");
}

// ============================================================================
// Seed Loading Tests
// ============================================================================

#[test]
fn test_load_urls_from_text_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "http://first.onion/")?;
    writeln!(temp_file, "second.onion")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "https://clearnet.example.com/")?;
    writeln!(temp_file, "http://first.onion/")?;
    writeln!(temp_file, "https://third.onion/page")?;

    let path = PathBuf::from(temp_file.path());
    let urls = load_urls_from_file(&path)?;

    assert_eq!(
        urls,
        vec![
            "http://first.onion/",
            "http://second.onion",
            "https://third.onion/page"
        ]
    );

    Ok(())
}

#[test]
fn test_load_urls_from_csv_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = Builder::new().suffix(".csv").tempfile()?;
    writeln!(temp_file, "url,name,notes")?;
    writeln!(temp_file, "http://market.onion/,Market,\"listing, prices\"")?;
    writeln!(temp_file, "forum.onion,Forum")?;
    writeln!(temp_file, "http://market.onion/,Duplicate")?;

    let urls = load_urls_from_file(temp_file.path())?;
    assert_eq!(urls, vec!["http://market.onion/", "http://forum.onion"]);

    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();
    writeln!(temp_file, "https://example.com").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_urls_from_file(&path);

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("No valid onion URLs"));
}

#[test]
fn test_load_urls_from_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_urls_from_file(&temp_dir.path().join("missing.txt"));
    assert!(result.unwrap_err().contains("Failed to read seeds file"));
}

#[test]
fn test_load_urls_from_source_single_url() {
    let url = Url::parse("http://abcdef.onion").unwrap();
    let result = load_urls_from_source(Some(&url), None).unwrap();

    assert_eq!(result, vec!["http://abcdef.onion/"]);
}

#[test]
fn test_load_urls_from_source_clearnet_url() {
    let url = Url::parse("https://example.com").unwrap();
    assert!(load_urls_from_source(Some(&url), None).is_err());
}

#[test]
fn test_load_urls_from_source_no_input() {
    let result = load_urls_from_source(None, None);
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .contains("Either --url or --seeds-file must be provided")
    );
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_overrides_replace_only_given_values() {
    let mut config = CrawlConfig {
        start_urls: vec!["http://fromfile.onion/".to_string()],
        max_depth: 5,
        ..CrawlConfig::default()
    };

    CrawlOverrides {
        max_pages: Some(7),
        categories: Some(vec!["Drugs".to_string()]),
        control_port: Some(9151),
        ..CrawlOverrides::default()
    }
    .apply(&mut config);

    assert_eq!(config.start_urls, vec!["http://fromfile.onion/"]);
    assert_eq!(config.max_pages, 7);
    assert_eq!(config.max_depth, 5);
    assert_eq!(config.enabled_categories, Some(vec!["Drugs".to_string()]));
    assert_eq!(config.control_port, 9151);
}

#[test]
fn test_overrides_start_urls_win() {
    let mut config = CrawlConfig {
        start_urls: vec!["http://fromfile.onion/".to_string()],
        ..CrawlConfig::default()
    };
    CrawlOverrides {
        start_urls: Some(vec!["http://cli.onion/".to_string()]),
        ..CrawlOverrides::default()
    }
    .apply(&mut config);

    assert_eq!(config.start_urls, vec!["http://cli.onion/"]);
}

#[test]
fn test_load_crawl_config_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, r#"{"max_pages": 12}"#).unwrap();

    let config = load_crawl_config(Some(path.as_path())).unwrap();
    assert_eq!(config.max_pages, 12);
    assert_eq!(config.max_depth, 3);
}

#[test]
fn test_load_crawl_config_missing_explicit_path() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_crawl_config(Some(temp_dir.path().join("nope.json").as_path()));
    assert!(result.is_err());
}

// ============================================================================
// Stored Settings Tests
// ============================================================================

fn known_categories() -> Vec<String> {
    ["Drugs", "Weapons", "Fraud"].iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_config_edits_write_through_save() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let mut config = CrawlConfig::default();

    let changes = ConfigEdits {
        max_depth: Some(5),
        rotation_threshold: Some(20),
        delay_secs: Some(1.5),
        ..ConfigEdits::default()
    }
    .apply(&mut config, &known_categories())
    .unwrap();
    config.save(&path).unwrap();

    assert_eq!(changes.len(), 3);
    let stored = CrawlConfig::load(&path).unwrap();
    assert_eq!(stored.max_depth, 5);
    assert_eq!(stored.rotation_threshold, 20);
    assert_eq!(stored.inter_request_delay_secs, 1.5);
}

#[test]
fn test_config_edits_disable_from_all() {
    let mut config = CrawlConfig::default();
    ConfigEdits {
        disable: vec!["Weapons".to_string()],
        ..ConfigEdits::default()
    }
    .apply(&mut config, &known_categories())
    .unwrap();

    assert_eq!(
        config.enabled_categories,
        Some(vec!["Drugs".to_string(), "Fraud".to_string()])
    );
}

#[test]
fn test_config_edits_enable_into_explicit_list() {
    let mut config = CrawlConfig {
        enabled_categories: Some(vec!["Drugs".to_string()]),
        ..CrawlConfig::default()
    };
    ConfigEdits {
        enable: vec!["Fraud".to_string(), "Drugs".to_string()],
        ..ConfigEdits::default()
    }
    .apply(&mut config, &known_categories())
    .unwrap();

    assert_eq!(
        config.enabled_categories,
        Some(vec!["Drugs".to_string(), "Fraud".to_string()])
    );
}

#[test]
fn test_config_edits_enable_keeps_all() {
    let mut config = CrawlConfig::default();
    ConfigEdits {
        enable: vec!["Fraud".to_string()],
        ..ConfigEdits::default()
    }
    .apply(&mut config, &known_categories())
    .unwrap();

    assert_eq!(config.enabled_categories, None);
}

#[test]
fn test_config_edits_reject_without_changing() {
    let mut config = CrawlConfig::default();
    let result = ConfigEdits {
        max_depth: Some(9),
        disable: vec!["Gardening".to_string()],
        ..ConfigEdits::default()
    }
    .apply(&mut config, &known_categories());
    assert!(result.unwrap_err().contains("Unknown category: Gardening"));
    assert_eq!(config, CrawlConfig::default());

    let result = ConfigEdits {
        delay_secs: Some(0.0),
        ..ConfigEdits::default()
    }
    .apply(&mut config, &known_categories());
    assert!(result.is_err());
    assert_eq!(config, CrawlConfig::default());
}

#[test]
fn test_config_edits_import_seeds_skips_duplicates() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "http://known.onion/")?;
    writeln!(temp_file, "fresh.onion")?;
    writeln!(temp_file, "https://clearnet.example.com/")?;
    let seeds = load_urls_from_file(temp_file.path())?;

    let mut config = CrawlConfig {
        start_urls: vec!["http://known.onion/".to_string()],
        ..CrawlConfig::default()
    };
    let changes = ConfigEdits {
        seeds: Some(seeds),
        ..ConfigEdits::default()
    }
    .apply(&mut config, &known_categories())?;

    assert_eq!(config.start_urls, vec!["http://known.onion/", "http://fresh.onion"]);
    assert_eq!(changes, vec!["Imported 1 new URLs (skipped 1 duplicates)"]);
    Ok(())
}

#[test]
fn test_config_edits_empty() {
    assert!(ConfigEdits::default().is_empty());
    assert!(
        !ConfigEdits {
            max_depth: Some(0),
            ..ConfigEdits::default()
        }
        .is_empty()
    );
}

#[test]
fn test_format_config_summary() {
    let config = CrawlConfig {
        enabled_categories: Some(vec!["Drugs".to_string(), "Fraud".to_string()]),
        ..CrawlConfig::default()
    };
    let summary = format_config_summary(&config, Path::new("/tmp/config.json"));
    assert!(summary.contains("Crawl depth:         3"));
    assert!(summary.contains("Drugs, Fraud"));
}

// ============================================================================
// Init and Classifier Tests
// ============================================================================

#[test]
fn test_create_configuration_assets() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("onionscope");

    let written = create_configuration_assets(&config_dir).unwrap();
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|path| path.exists()));

    let config = CrawlConfig::load(&config_dir.join("config.json")).unwrap();
    assert_eq!(
        config.keywords_file,
        Some(config_dir.join("keywords").join("default.csv"))
    );
    assert_eq!(config.output_dir(), config_dir.join("output"));

    // The installed assets load back into a working classifier
    let (classifier, problems) = build_classifier(
        config.keywords_file.as_deref(),
        Some(config_dir.join("categories").join("example.json").as_path()),
        config.fuzzy_threshold,
    );
    assert!(problems.is_empty());
    assert!(classifier.is_known("Counterfeit_Currency"));
    assert_eq!(classifier.severity_of("Drugs"), 4);
}

#[test]
fn test_create_configuration_assets_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let keywords = temp_dir.path().join("keywords").join("default.csv");
    fs::create_dir_all(keywords.parent().unwrap()).unwrap();
    fs::write(&keywords, "stale").unwrap();

    create_configuration_assets(temp_dir.path()).unwrap();
    assert_ne!(fs::read_to_string(&keywords).unwrap(), "stale");
}

#[test]
fn test_build_classifier_bundled_table() {
    let (classifier, problems) = build_classifier(None, None, 80);
    assert!(problems.is_empty());
    assert!(classifier.keywords().table().keyword_count() > 0);
    assert!(classifier.is_known("Drugs"));
}

#[test]
fn test_build_classifier_missing_keyword_file_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.csv");
    let (classifier, problems) = build_classifier(Some(missing.as_path()), None, 80);

    // The keyword source contributes nothing, pattern rules still apply
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("Failed to load keyword table"));
    assert!(classifier.keywords().table().is_empty());
    assert!(classifier.is_known("Drugs"));
}

#[test]
fn test_format_category_list() {
    let (mut classifier, _) = build_classifier(None, None, 80);
    classifier.disable("Weapons");

    let listing = format_category_list(&classifier);
    assert!(listing.contains("Human_Trafficking"));
    assert!(listing.contains("critical"));
    assert!(listing.contains("disabled"));
}

#[test]
fn test_build_classifier_bad_custom_categories_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let custom = temp_dir.path().join("custom.json");
    fs::write(&custom, "{ not json").unwrap();

    let (classifier, problems) = build_classifier(None, Some(custom.as_path()), 80);
    assert_eq!(problems.len(), 1);
    assert_eq!(classifier.category_list().len(), 6);
}
