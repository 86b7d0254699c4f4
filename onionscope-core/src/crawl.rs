use crate::alerts::{Alert, AlertLog};
use crate::checkpoint::CheckpointStore;
use crate::classifier::CategoryClassifier;
use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use crate::report::CrawlSummary;
use chrono::Utc;
use onionscope_scanner::error::FetchError;
use onionscope_scanner::extract::ContentExtractor;
use onionscope_scanner::fetcher::{FetchedPage, Fetcher};
use onionscope_scanner::frontier::FrontierState;
use onionscope_scanner::identity::IdentityRotator;
use onionscope_scanner::page::PageRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Error text that means the page wants a human, not a retry.
const LOGIN_WALL_MARKERS: [&str; 4] = ["login", "captcha", "robot", "verification"];

const SUSPICIOUS_MARKERS: [&str; 8] = [
    "download now",
    "install plugin",
    "allow notifications",
    "enable javascript",
    "enable flash",
    "download extension",
    "install now",
    "enable java",
];

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Options for a single crawl run
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub start_urls: Vec<String>,
    pub max_pages: usize,
    pub max_depth: usize,
    pub inter_request_delay: Duration,
    pub alert_confidence_threshold: f64,
    pub fetch_timeout: Duration,
    /// `None` leaves the classifier's enabled set untouched
    pub enabled_categories: Option<Vec<String>>,
}

impl CrawlOptions {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            start_urls: config.start_urls.clone(),
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            inter_request_delay: Duration::try_from_secs_f64(config.inter_request_delay_secs)
                .unwrap_or(Duration::ZERO),
            alert_confidence_threshold: config.alert_confidence_threshold,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            enabled_categories: config.enabled_categories.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_urls.is_empty() {
            return Err(CrawlError::InvalidParameter(
                "at least one start URL is required".to_string(),
            ));
        }
        if self.max_pages == 0 {
            return Err(CrawlError::InvalidParameter(
                "max_pages must be greater than 0".to_string(),
            ));
        }
        if self.inter_request_delay.is_zero() {
            return Err(CrawlError::InvalidParameter(
                "inter-request delay must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.alert_confidence_threshold) {
            return Err(CrawlError::InvalidParameter(
                "alert confidence threshold must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where one session's pages, alerts and summary live.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFiles {
    pub session_id: String,
    pub pages: PathBuf,
    pub alerts: PathBuf,
    pub summary: PathBuf,
}

impl SessionFiles {
    pub fn new(output_dir: &Path, session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            pages: output_dir.join(format!("pages_{}.jsonl", session_id)),
            alerts: output_dir.join(format!("alerts_{}.jsonl", session_id)),
            summary: output_dir.join(format!("summary_{}.json", session_id)),
        }
    }

    /// `YYYYmmdd_HHMMSS_` plus eight hex digits, sortable by start time.
    pub fn generate_session_id() -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
    }
}

/// Whether a fetch error reads like a login wall or bot check.
pub fn is_login_wall(error: &str) -> bool {
    let error = error.to_lowercase();
    LOGIN_WALL_MARKERS.iter().any(|marker| error.contains(marker))
}

fn has_suspicious_content(html: &str) -> bool {
    let html = html.to_lowercase();
    SUSPICIOUS_MARKERS.iter().any(|marker| html.contains(marker))
}

/// One sequential crawl: frontier, identity, fetch, extract, classify,
/// alert and checkpoint, one URL at a time.
pub struct CrawlSession {
    options: CrawlOptions,
    files: SessionFiles,
    frontier: FrontierState,
    rotator: IdentityRotator,
    fetcher: Box<dyn Fetcher>,
    extractor: ContentExtractor,
    classifier: CategoryClassifier,
    alerts: AlertLog,
    checkpoint: CheckpointStore,
    results: Vec<PageRecord>,
    alerts_raised: usize,
    cancel: CancellationToken,
    progress: Option<CrawlProgressCallback>,
}

impl CrawlSession {
    /// Validate the options, seed the frontier and open both stores.
    pub fn new(
        options: CrawlOptions,
        files: SessionFiles,
        fetcher: Box<dyn Fetcher>,
        rotator: IdentityRotator,
        mut classifier: CategoryClassifier,
    ) -> Result<Self> {
        options.validate()?;

        if let Some(enabled) = &options.enabled_categories {
            classifier.restrict_to(enabled);
        }

        let frontier = FrontierState::with_seeds(&options.start_urls);
        if frontier.is_exhausted() {
            return Err(CrawlError::InvalidParameter(
                "none of the start URLs could be parsed".to_string(),
            ));
        }

        let checkpoint = CheckpointStore::open(&files.pages)?;
        let alerts = AlertLog::open(&files.alerts)?;

        Ok(Self {
            options,
            files,
            frontier,
            rotator,
            fetcher,
            extractor: ContentExtractor::new(),
            classifier,
            alerts,
            checkpoint,
            results: Vec::new(),
            alerts_raised: 0,
            cancel: CancellationToken::new(),
            progress: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: CrawlProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Token that stops the loop between iterations when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn files(&self) -> &SessionFiles {
        &self.files
    }

    /// Page records in crawl order.
    pub fn results(&self) -> &[PageRecord] {
        &self.results
    }

    pub fn alert_log(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn frontier(&self) -> &FrontierState {
        &self.frontier
    }

    pub fn rotator(&self) -> &IdentityRotator {
        &self.rotator
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut CategoryClassifier {
        &mut self.classifier
    }

    /// Crawl until the frontier is empty, the page budget is spent or the
    /// session is cancelled, then write the summary.
    ///
    /// Per-URL failures end up on page records. Only persistence failures
    /// stop the run early.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let started_at = Utc::now();

        if !self.rotator.is_reachable().await {
            warn!("Anonymity layer is not reachable, fetches are likely to fail");
        }
        info!(
            "Starting crawl session {} with {} seed(s), max {} pages, depth {}",
            self.files.session_id,
            self.frontier.queue_len(),
            self.options.max_pages,
            self.options.max_depth
        );

        let mut cancelled = false;
        loop {
            if self.cancel.is_cancelled() {
                info!("Crawl cancelled, stopping");
                cancelled = true;
                break;
            }
            if self.frontier.pages_crawled() >= self.options.max_pages {
                info!("Page budget of {} reached", self.options.max_pages);
                break;
            }
            let Some((url, depth)) = self.frontier.next_url() else {
                break;
            };

            if let Err(e) = self.process(&url, depth).await {
                error!("Stopping crawl at {}: {}", url, e);
                return Err(e);
            }

            if self.frontier.is_exhausted()
                || self.frontier.pages_crawled() >= self.options.max_pages
            {
                continue;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.options.inter_request_delay) => {}
            }
        }

        let summary = CrawlSummary::from_pages(
            &self.files.session_id,
            started_at,
            &self.results,
            self.alerts_raised,
            cancelled,
        );
        summary.write(&self.files.summary)?;
        info!(
            "Crawl session {} finished: {} pages ({} ok, {} failed), {} alerts",
            summary.session_id,
            summary.total_pages,
            summary.successful_pages,
            summary.failed_pages,
            summary.alerts_raised
        );
        Ok(summary)
    }

    async fn process(&mut self, url: &str, depth: usize) -> Result<()> {
        self.report_progress(format!(
            "[{}/{}] {} (depth {})",
            self.frontier.pages_crawled() + 1,
            self.options.max_pages,
            url,
            depth
        ));

        if self.rotator.should_rotate() {
            self.rotator.rotate().await;
        }

        let record = match self.fetch(url).await {
            Ok(page) => self.handle_page(url, depth, page)?,
            Err(e) => {
                let message = e.to_string();
                let mut record = PageRecord::with_error(url.to_string(), message.clone());
                record.requires_login = is_login_wall(&message);
                if record.requires_login {
                    warn!("{} needs a login or verification: {}", url, message);
                } else {
                    warn!("Failed to fetch {}: {}", url, message);
                }
                record
            }
        };

        self.checkpoint.append_page(&record)?;
        self.frontier.record_page();
        self.results.push(record);
        Ok(())
    }

    /// One attempt, then one reset-and-retry unless the failure is a login
    /// wall. Every attempt counts towards rotation.
    async fn fetch(&mut self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        self.rotator.record_request();
        let first = match self.fetcher.fetch(url, self.options.fetch_timeout).await {
            Ok(page) => return Ok(page),
            Err(e) => e,
        };

        if is_login_wall(&first.to_string()) {
            return Err(first);
        }

        warn!("Fetch of {} failed ({}), resetting fetcher and retrying", url, first);
        if let Err(e) = self.fetcher.reset().await {
            warn!("Fetcher reset failed: {}", e);
            return Err(first);
        }

        self.rotator.record_request();
        self.fetcher.fetch(url, self.options.fetch_timeout).await
    }

    fn handle_page(&mut self, url: &str, depth: usize, page: FetchedPage) -> Result<PageRecord> {
        if has_suspicious_content(&page.html) {
            warn!("Potentially malicious content at {}", url);
        }

        let mut record = match self.extractor.extract(url, &page.html) {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not extract {}: {}", url, e);
                return Ok(PageRecord::with_error(url.to_string(), e.to_string()));
            }
        };

        let text = record.classification_text();
        let classification = self.classifier.classify(&text, url);
        for (category, result) in &classification {
            if result.confidence < self.options.alert_confidence_threshold {
                continue;
            }
            let snippet = result
                .evidence
                .first()
                .map(|e| e.context.as_str())
                .unwrap_or_default();
            self.alerts
                .append(Alert::new(url, category, result.severity, snippet))?;
            self.alerts_raised += 1;
        }
        record.classification = classification;

        let links: Vec<String> = record.onion_links().map(|l| l.url.clone()).collect();
        let queued = self.frontier.offer_children(
            links.iter().map(String::as_str),
            depth,
            self.options.max_depth,
        );
        debug!(
            "{}: {} onion links, {} newly queued",
            url,
            links.len(),
            queued
        );

        info!(
            "Crawled {} ({}), {} categories matched",
            url,
            record.title,
            record.classification.len()
        );
        Ok(record)
    }

    fn report_progress(&self, message: String) {
        if let Some(callback) = &self.progress {
            callback(message);
        }
    }
}
