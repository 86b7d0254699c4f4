// Crawl summaries and terminal reports

use crate::alerts::{Alert, AlertStats};
use crate::error::PersistenceError;
use crate::jsonl;
use chrono::{DateTime, Utc};
use colored::Colorize;
use onionscope_scanner::page::PageRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Written next to the checkpoint when a run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_pages: usize,
    pub successful_pages: usize,
    pub failed_pages: usize,
    pub alerts_raised: usize,
    pub urls_crawled: Vec<String>,
    pub cancelled: bool,
}

impl CrawlSummary {
    pub fn from_pages(
        session_id: &str,
        started_at: DateTime<Utc>,
        pages: &[PageRecord],
        alerts_raised: usize,
        cancelled: bool,
    ) -> Self {
        let successful_pages = pages.iter().filter(|p| p.is_success()).count();
        Self {
            session_id: session_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            total_pages: pages.len(),
            successful_pages,
            failed_pages: pages.len() - successful_pages,
            alerts_raised,
            urls_crawled: pages.iter().map(|p| p.url.clone()).collect(),
            cancelled,
        }
    }

    /// Pretty JSON, replaced atomically.
    pub fn write(&self, path: &Path) -> Result<(), PersistenceError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        jsonl::write_atomic(path, json.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let content = std::fs::read_to_string(path).map_err(|source| PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            line: 1,
            source,
        })
    }
}

pub fn severity_label(severity: u8) -> &'static str {
    match severity {
        5 => "critical",
        4 => "high",
        3 => "medium",
        2 => "low",
        _ => "info",
    }
}

fn colored_severity(severity: u8) -> String {
    let label = format!("[{}]", severity);
    match severity {
        5 => label.red().bold().to_string(),
        4 => label.red().to_string(),
        3 => label.yellow().to_string(),
        2 => label.cyan().to_string(),
        _ => label.white().to_string(),
    }
}

/// Path component of a URL, `/` when empty.
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Human-readable crawl report, pages grouped by host.
pub fn generate_crawl_report(summary: &CrawlSummary, pages: &[PageRecord]) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Session: {}\n", summary.session_id));
    report.push_str(&format!("  Pages crawled: {}\n", summary.total_pages));
    report.push_str(&format!("  Successful: {}\n", summary.successful_pages));
    report.push_str(&format!("  Failed: {}\n", summary.failed_pages));
    report.push_str(&format!("  Alerts raised: {}\n", summary.alerts_raised));
    if summary.cancelled {
        report.push_str("  Stopped early: cancelled\n");
    }

    let login_walls = pages.iter().filter(|p| p.requires_login).count();
    if login_walls > 0 {
        report.push_str(&format!("  Login or verification walls: {}\n", login_walls));
    }

    report.push('\n');
    report.push_str(DIVIDER);
    report.push_str("\n\n");

    let mut by_host: BTreeMap<String, Vec<&PageRecord>> = BTreeMap::new();
    for page in pages {
        let host = Url::parse(&page.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| page.url.clone());
        by_host.entry(host).or_default().push(page);
    }

    for (host, host_pages) in &by_host {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} pages\n\n", host_pages.len()));

        for page in host_pages {
            let path = extract_url_path(&page.url);
            match &page.error {
                Some(error) => {
                    let marker = if page.requires_login {
                        "LOGIN".yellow()
                    } else {
                        "ERR".red()
                    };
                    report.push_str(&format!("  {} {} {}\n", marker, path, error.dimmed()));
                }
                None => {
                    report.push_str(&format!("  {} {} {}\n", "OK".green(), path, page.title));
                    for result in page.classification.values() {
                        report.push_str(&format!(
                            "      {} {} ({:.0}% confidence, {} evidence)\n",
                            colored_severity(result.severity),
                            result.category,
                            result.confidence,
                            result.evidence.len()
                        ));
                    }
                }
            }
        }
        report.push('\n');
    }

    report
}

/// Alerts newest first followed by aggregate counts.
pub fn generate_alert_report(alerts: &[Alert], stats: &AlertStats) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n");
    report.push_str("# Alerts:\n");

    if alerts.is_empty() {
        report.push_str("  No alerts match\n");
    }
    for alert in alerts {
        report.push_str(&format!(
            "  {} {} {} {}\n",
            alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
            colored_severity(alert.severity),
            alert.category.bold(),
            alert.url
        ));
        if !alert.snippet.is_empty() {
            report.push_str(&format!("      \"{}\"\n", alert.snippet));
        }
    }

    report.push('\n');
    report.push_str("# Statistics:\n");
    report.push_str(&format!("  Total alerts: {}\n", stats.total));
    for (category, count) in &stats.per_category {
        report.push_str(&format!("  {}: {}\n", category, count));
    }
    for (severity, count) in stats.per_severity.iter().rev() {
        report.push_str(&format!(
            "  Severity {} ({}): {}\n",
            severity,
            severity_label(*severity),
            count
        ));
    }
    report
}
