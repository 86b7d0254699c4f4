use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use onionscope_core::classifier::{CategoryClassifier, EXAMPLE_CATEGORIES};
use onionscope_core::config::{CONFIG_FILE_NAME, CrawlConfig, default_config_dir};
use onionscope_core::crawl::{CrawlOptions, CrawlSession, SessionFiles};
use onionscope_core::keywords::{DEFAULT_KEYWORDS, KeywordMatcher, KeywordTable};
use onionscope_core::report::{generate_alert_report, generate_crawl_report, severity_label};
use onionscope_core::AlertLog;
use onionscope_scanner::extract::is_onion_url;
use onionscope_scanner::fetcher::HttpFetcher;
use onionscope_scanner::identity::{DEFAULT_SOCKS_ADDR, IdentityRotator, TorControl};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

const SEED_HEADERS: [&str; 4] = ["url", "link", "address", "onion"];

// Helper functions for crawl handler

/// Load seed URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    seeds_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(seeds_file_path) = seeds_file {
        load_urls_from_file(seeds_file_path)
    } else if let Some(url) = url {
        parse_url_line(url.as_str())
            .map(|url| vec![url])
            .ok_or_else(|| format!("{} is not an onion URL", url))
    } else {
        Err("Either --url or --seeds-file must be provided".to_string())
    }
}

/// Load onion seeds from a text file (one per line) or a CSV file (first
/// column). Duplicates are dropped, file order is kept.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read seeds file {}: {}", path.display(), e))?;

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let candidates = if is_csv {
        csv_first_column(&content)
            .map_err(|e| format!("Failed to parse seeds file {}: {}", path.display(), e))?
    } else {
        content.lines().map(str::to_string).collect()
    };

    let mut seen = HashSet::new();
    let urls: Vec<String> = candidates
        .iter()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .filter(|url| seen.insert(url.clone()))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid onion URLs found in {}", path.display()));
    }

    Ok(urls)
}

fn csv_first_column(content: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut cells = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let Some(cell) = record.get(0) else {
            continue;
        };
        if index == 0 && SEED_HEADERS.contains(&cell.to_lowercase().as_str()) {
            continue;
        }
        cells.push(cell.to_string());
    }
    Ok(cells)
}

/// Parse a single line as an onion URL, adding http:// if needed.
/// Comments, other schemes and clearnet hosts are skipped.
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let candidate = match Url::parse(line) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => line.to_string(),
        _ => format!("http://{}", line),
    };

    match Url::parse(&candidate) {
        Ok(url) if is_onion_url(&url) => Some(candidate),
        Ok(_) => {
            eprintln!("⚠️  Skipping non-onion URL '{}'", line);
            None
        }
        Err(_) => {
            eprintln!("⚠️  Skipping invalid URL '{}'", line);
            None
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Crawl settings given on the command line. Anything set here wins over
/// the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlOverrides {
    pub start_urls: Option<Vec<String>>,
    pub max_pages: Option<usize>,
    pub max_depth: Option<usize>,
    pub rotation_threshold: Option<u32>,
    pub delay_secs: Option<f64>,
    pub alert_threshold: Option<f64>,
    pub categories: Option<Vec<String>>,
    pub keywords_file: Option<PathBuf>,
    pub custom_categories_file: Option<PathBuf>,
    pub output_dir: Option<String>,
    pub socks_proxy: Option<String>,
    pub control_port: Option<u16>,
}

impl CrawlOverrides {
    pub fn from_matches(sub_matches: &ArgMatches) -> Result<Self, String> {
        let url = sub_matches.get_one::<Url>("url");
        let seeds_file = sub_matches.get_one::<PathBuf>("seeds-file");
        let start_urls = if url.is_some() || seeds_file.is_some() {
            Some(load_urls_from_source(url, seeds_file)?)
        } else {
            None
        };

        Ok(Self {
            start_urls,
            max_pages: sub_matches.get_one::<usize>("max-pages").copied(),
            max_depth: sub_matches.get_one::<usize>("max-depth").copied(),
            rotation_threshold: sub_matches.get_one::<u32>("rotation-threshold").copied(),
            delay_secs: sub_matches.get_one::<f64>("delay").copied(),
            alert_threshold: sub_matches.get_one::<f64>("alert-threshold").copied(),
            categories: sub_matches
                .get_many::<String>("categories")
                .map(|values| values.map(|v| v.trim().to_string()).collect()),
            keywords_file: sub_matches.get_one::<PathBuf>("keywords").cloned(),
            custom_categories_file: sub_matches.get_one::<PathBuf>("custom-categories").cloned(),
            output_dir: sub_matches.get_one::<String>("output-dir").cloned(),
            socks_proxy: sub_matches.get_one::<String>("proxy").cloned(),
            control_port: sub_matches.get_one::<u16>("control-port").copied(),
        })
    }

    pub fn apply(self, config: &mut CrawlConfig) {
        if let Some(start_urls) = self.start_urls {
            config.start_urls = start_urls;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(threshold) = self.rotation_threshold {
            config.rotation_threshold = threshold;
        }
        if let Some(delay) = self.delay_secs {
            config.inter_request_delay_secs = delay;
        }
        if let Some(threshold) = self.alert_threshold {
            config.alert_confidence_threshold = threshold;
        }
        if self.categories.is_some() {
            config.enabled_categories = self.categories;
        }
        if self.keywords_file.is_some() {
            config.keywords_file = self.keywords_file;
        }
        if self.custom_categories_file.is_some() {
            config.custom_categories_file = self.custom_categories_file;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(proxy) = self.socks_proxy {
            config.socks_proxy = proxy;
        }
        if let Some(port) = self.control_port {
            config.control_port = port;
        }
    }
}

/// Config from an explicit path, else `~/.config/onionscope/config.json`
/// when it exists, else defaults.
pub fn load_crawl_config(path: Option<&Path>) -> anyhow::Result<CrawlConfig> {
    if let Some(path) = path {
        let path = expand_path(path);
        return CrawlConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = default_config_dir().join(CONFIG_FILE_NAME);
    if default_path.exists() {
        CrawlConfig::load(&default_path)
            .with_context(|| format!("Failed to load config {}", default_path.display()))
    } else {
        Ok(CrawlConfig::default())
    }
}

/// Settings written back to `config.json` by `onionscope config`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigEdits {
    pub max_depth: Option<usize>,
    pub rotation_threshold: Option<u32>,
    pub delay_secs: Option<f64>,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub seeds: Option<Vec<String>>,
}

impl ConfigEdits {
    pub fn from_matches(sub_matches: &ArgMatches) -> Result<Self, String> {
        let names = |id: &str| -> Vec<String> {
            sub_matches
                .get_many::<String>(id)
                .map(|values| values.map(|v| v.trim().to_string()).collect())
                .unwrap_or_default()
        };
        let seeds = sub_matches
            .get_one::<PathBuf>("import-seeds")
            .map(|path| load_urls_from_file(&expand_path(path)))
            .transpose()?;

        Ok(Self {
            max_depth: sub_matches.get_one::<usize>("set-depth").copied(),
            rotation_threshold: sub_matches.get_one::<u32>("set-rotation").copied(),
            delay_secs: sub_matches.get_one::<f64>("set-scan-frequency").copied(),
            enable: names("enable-category"),
            disable: names("disable-category"),
            seeds,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every edit to `config` and describe each change.
    ///
    /// `known` lists every category the configured classifier knows. Nothing
    /// is changed when an edit is rejected.
    pub fn apply(self, config: &mut CrawlConfig, known: &[String]) -> Result<Vec<String>, String> {
        if let Some(delay) = self.delay_secs
            && (!delay.is_finite() || delay <= 0.0)
        {
            return Err("Scan frequency must be a positive number of seconds".to_string());
        }
        if let Some(name) = self
            .enable
            .iter()
            .chain(&self.disable)
            .find(|name| !known.contains(name))
        {
            return Err(format!("Unknown category: {}", name));
        }

        let mut changes = Vec::new();
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
            changes.push(format!("Set crawl depth to {}", depth));
        }
        if let Some(threshold) = self.rotation_threshold {
            config.rotation_threshold = threshold;
            changes.push(format!("Set identity rotation to every {} requests", threshold));
        }
        if let Some(delay) = self.delay_secs {
            config.inter_request_delay_secs = delay;
            changes.push(format!("Set scan frequency to {} seconds", delay));
        }

        // `None` means every category, so enabling only matters for an
        // explicit list and disabling first materializes one.
        for name in self.enable {
            if let Some(enabled) = config.enabled_categories.as_mut()
                && !enabled.contains(&name)
            {
                enabled.push(name.clone());
            }
            changes.push(format!("Enabled category: {}", name));
        }
        for name in self.disable {
            config
                .enabled_categories
                .get_or_insert_with(|| known.to_vec())
                .retain(|c| *c != name);
            changes.push(format!("Disabled category: {}", name));
        }

        if let Some(seeds) = self.seeds {
            let total = seeds.len();
            let mut added = 0;
            for url in seeds {
                if !config.start_urls.contains(&url) {
                    config.start_urls.push(url);
                    added += 1;
                }
            }
            changes.push(format!(
                "Imported {} new URLs (skipped {} duplicates)",
                added,
                total - added
            ));
        }

        Ok(changes)
    }
}

/// Keyword table (file or bundled) plus optional custom categories.
///
/// A source that fails to load contributes nothing; the problems are
/// returned so the caller can report them.
pub fn build_classifier(
    keywords_file: Option<&Path>,
    custom_categories_file: Option<&Path>,
    fuzzy_threshold: u8,
) -> (CategoryClassifier, Vec<String>) {
    let mut problems = Vec::new();

    let table = match keywords_file {
        Some(path) => {
            let path = expand_path(path);
            KeywordTable::load(&path).unwrap_or_else(|e| {
                problems.push(format!("Failed to load keyword table {}: {}", path.display(), e));
                KeywordTable::default()
            })
        }
        None => KeywordTable::bundled(),
    };

    let mut classifier = CategoryClassifier::new(KeywordMatcher::new(table, fuzzy_threshold));
    if let Some(path) = custom_categories_file {
        let path = expand_path(path);
        if let Err(e) = classifier.load_custom_categories(&path) {
            problems.push(format!(
                "Failed to load custom categories {}: {}",
                path.display(),
                e
            ));
        }
    }
    (classifier, problems)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, repeated calls) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  ONIONSCOPE INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let default_dir = "~/.config/onionscope/".to_string();
    let config_dir = args.get_one::<String>("PATH").unwrap_or(&default_dir);
    let force = args.get_flag("force");
    let config_dir = expand_path(Path::new(config_dir));

    println!("{} Parsed arguments", "✓".green().bold());
    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    let existing: Vec<PathBuf> = configuration_asset_paths(&config_dir)
        .into_iter()
        .filter(|path| path.exists())
        .collect();

    // Check for existing installation
    if !existing.is_empty() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Configuration files already exist:");
        for path in &existing {
            println!(
                "  {} {}",
                "•".yellow(),
                path.display().to_string().bright_white()
            );
        }
        println!();
        println!(
            "{}",
            "This operation will overwrite existing files.".yellow()
        );

        let response = print_prompt("Do you want to continue? [y/N]:");
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return;
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    println!("{} Creating configuration files...", "→".blue());
    let written = match create_configuration_assets(&config_dir) {
        Ok(written) => written,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(1);
        }
    };
    for path in &written {
        println!(
            "  {} {}",
            "✓".green(),
            path.display().to_string().bright_white()
        );
    }

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config directory: {}",
        "✓".green().bold(),
        config_dir.display().to_string().bright_white()
    );
    println!(
        "{} Keywords: {} entries",
        "✓".green().bold(),
        KeywordTable::bundled().keyword_count().to_string().cyan()
    );
    println!();
}

fn configuration_asset_paths(config_dir: &Path) -> [PathBuf; 3] {
    [
        config_dir.join(CONFIG_FILE_NAME),
        config_dir.join("keywords").join("default.csv"),
        config_dir.join("categories").join("example.json"),
    ]
}

/// Write the default config, the bundled keyword table and the example
/// custom categories under `config_dir`. Returns the written paths.
pub fn create_configuration_assets(config_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let [config_path, keywords_path, categories_path] = configuration_asset_paths(config_dir);

    for path in [&config_path, &keywords_path, &categories_path] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    fs::write(&keywords_path, DEFAULT_KEYWORDS)
        .with_context(|| format!("Failed to write {}", keywords_path.display()))?;
    fs::write(&categories_path, EXAMPLE_CATEGORIES)
        .with_context(|| format!("Failed to write {}", categories_path.display()))?;

    let config = CrawlConfig {
        keywords_file: Some(keywords_path.clone()),
        output_dir: config_dir.join("output").to_string_lossy().into_owned(),
        ..CrawlConfig::default()
    };
    config
        .save(&config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    Ok(vec![config_path, keywords_path, categories_path])
}

pub async fn handle_crawl(sub_matches: &ArgMatches) {
    init_tracing();

    if let Err(e) = run_crawl(sub_matches).await {
        eprintln!("✗ Crawl failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_crawl(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let overrides = CrawlOverrides::from_matches(sub_matches).map_err(anyhow::Error::msg)?;
    let mut config = load_crawl_config(sub_matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    overrides.apply(&mut config);
    if config.start_urls.is_empty() {
        bail!("Either --url, --seeds-file or start_urls in the config must be provided");
    }
    config.validate()?;

    let direct = sub_matches.get_flag("direct");

    // Print crawl configuration
    println!("\n🧅 Crawling {} seed(s)", config.start_urls.len());
    println!("Max pages: {}", config.max_pages);
    println!("Max depth: {}", config.max_depth);
    println!("New identity every {} requests", config.rotation_threshold);
    println!("Delay between requests: {}s", config.inter_request_delay_secs);
    println!(
        "Proxy: {}\n",
        if direct { "none (direct)" } else { config.socks_proxy.as_str() }
    );

    let (classifier, problems) = build_classifier(
        config.keywords_file.as_deref(),
        config.custom_categories_file.as_deref(),
        config.fuzzy_threshold,
    );
    for problem in &problems {
        warn!("{}, continuing without it", problem);
    }

    let fetcher = HttpFetcher::new((!direct).then_some(config.socks_proxy.as_str()))?;
    let socks_addr = config
        .socks_addr()
        .unwrap_or_else(|| DEFAULT_SOCKS_ADDR.to_string());
    let control = TorControl::new(config.control_addr(), socks_addr)
        .with_password(config.control_password.clone());
    let rotator = IdentityRotator::new(Box::new(control), config.rotation_threshold);

    let output_dir = config.output_dir();
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let files = SessionFiles::new(&output_dir, &SessionFiles::generate_session_id());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress_bar = spinner.clone();
    let mut session = CrawlSession::new(
        CrawlOptions::from_config(&config),
        files,
        Box::new(fetcher),
        rotator,
        classifier,
    )?
    .with_progress_callback(Arc::new(move |msg: String| {
        progress_bar.set_message(msg);
    }));

    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = session.run().await;
    spinner.finish_and_clear();
    let summary = result?;

    println!("\n✓ Crawl complete!\n");
    print!("{}", generate_crawl_report(&summary, session.results()));
    println!();
    println!(
        "{} Pages: {}",
        "→".blue(),
        session.files().pages.display().to_string().bright_white()
    );
    println!(
        "{} Alerts: {}",
        "→".blue(),
        session.files().alerts.display().to_string().bright_white()
    );
    println!(
        "{} Summary: {}",
        "→".blue(),
        session.files().summary.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_alerts(args: &ArgMatches) {
    let Some(path) = args.get_one::<PathBuf>("file") else {
        eprintln!("✗ --file is required");
        std::process::exit(1);
    };
    let path = expand_path(path);
    if !path.exists() {
        eprintln!("✗ Alert log not found: {}", path.display());
        std::process::exit(1);
    }

    let log = match AlertLog::open(&path) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let category = args.get_one::<String>("category").map(String::as_str);
    let min_severity = args.get_one::<u8>("min-severity").copied();
    let limit = args.get_one::<usize>("limit").copied();

    let alerts = log.query(category, min_severity, limit);
    print!("{}", generate_alert_report(&alerts, &log.stats()));
}

pub fn handle_categories(args: &ArgMatches) {
    let keywords = args.get_one::<PathBuf>("keywords").map(PathBuf::as_path);
    let custom = args.get_one::<PathBuf>("custom-categories").map(PathBuf::as_path);

    let (classifier, problems) =
        build_classifier(keywords, custom, CrawlConfig::default().fuzzy_threshold);
    for problem in &problems {
        eprintln!("⚠️  {}", problem);
    }

    print!("{}", format_category_list(&classifier));
}

pub fn handle_config(args: &ArgMatches) {
    let path = args
        .get_one::<PathBuf>("config")
        .map(|p| expand_path(p))
        .unwrap_or_else(|| default_config_dir().join(CONFIG_FILE_NAME));

    let edits = match ConfigEdits::from_matches(args) {
        Ok(edits) => edits,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let mut config = if path.exists() {
        match CrawlConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("✗ Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        CrawlConfig::default()
    };

    if edits.is_empty() {
        print!("{}", format_config_summary(&config, &path));
        return;
    }

    let (classifier, problems) = build_classifier(
        config.keywords_file.as_deref(),
        config.custom_categories_file.as_deref(),
        config.fuzzy_threshold,
    );
    for problem in &problems {
        eprintln!("⚠️  {}", problem);
    }
    let known: Vec<String> = classifier
        .category_list()
        .into_iter()
        .map(|info| info.name)
        .collect();

    let changes = match edits.apply(&mut config, &known) {
        Ok(changes) => changes,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.save(&path) {
        eprintln!("✗ Failed to write {}: {}", path.display(), e);
        std::process::exit(1);
    }

    for change in &changes {
        println!("{} {}", "✓".green().bold(), change);
    }
    println!("{} Saved {}", "→".blue(), path.display().to_string().bright_white());
}

/// The settings `onionscope config` can change, as currently stored.
pub fn format_config_summary(config: &CrawlConfig, path: &Path) -> String {
    let categories = match &config.enabled_categories {
        Some(names) => names.join(", "),
        None => "all".to_string(),
    };
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", "# Config:".bright_white().bold(), path.display()));
    out.push_str(&format!("  Seeds:               {}\n", config.start_urls.len()));
    out.push_str(&format!("  Crawl depth:         {}\n", config.max_depth));
    out.push_str(&format!("  Rotation threshold:  {}\n", config.rotation_threshold));
    out.push_str(&format!("  Scan frequency:      {}s\n", config.inter_request_delay_secs));
    out.push_str(&format!("  Enabled categories:  {}\n", categories));
    out
}

/// One line per known category: name, severity, keyword count, state.
pub fn format_category_list(classifier: &CategoryClassifier) -> String {
    let table = classifier.keywords().table();
    let mut out = String::new();
    out.push_str(&format!("{}\n", "# Categories:".bright_white().bold()));
    for info in classifier.category_list() {
        let keyword_count = table.keywords(&info.name).map_or(0, |keywords| keywords.len());
        let state = if info.enabled {
            "enabled".green().to_string()
        } else {
            "disabled".dimmed().to_string()
        };
        out.push_str(&format!(
            "  {:<20} severity {} ({:<8}) {:>3} keywords  {}\n",
            info.name,
            info.severity,
            severity_label(info.severity),
            keyword_count,
            state
        ));
    }
    out
}
