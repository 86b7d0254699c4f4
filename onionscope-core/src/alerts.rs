use crate::error::PersistenceError;
use crate::jsonl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// A high-confidence classification, persisted as soon as it is raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub url: String,
    pub category: String,
    pub severity: u8,
    pub snippet: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(url: &str, category: &str, severity: u8, snippet: &str) -> Self {
        Self {
            url: url.to_string(),
            category: category.to_string(),
            severity,
            snippet: snippet.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertStats {
    pub total: usize,
    pub per_category: BTreeMap<String, usize>,
    /// Always holds keys 1 through 5
    pub per_severity: BTreeMap<u8, usize>,
}

/// Append-only alert store backed by a JSON Lines file.
pub struct AlertLog {
    path: PathBuf,
    alerts: Vec<Alert>,
}

impl AlertLog {
    /// Open (or create) the log at `path`, loading whatever it already holds.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        jsonl::touch(&path)?;
        let alerts = jsonl::read_all(&path)?;
        if !alerts.is_empty() {
            info!("Loaded {} existing alerts from {}", alerts.len(), path.display());
        }
        Ok(Self { path, alerts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Alerts in the order they were written.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Persist `alert`. It is on disk before this returns.
    pub fn append(&mut self, alert: Alert) -> Result<(), PersistenceError> {
        jsonl::append(&self.path, &alert)?;

        match alert.severity {
            4.. => error!(
                "ALERT [{}] [Severity: {}] URL: {}",
                alert.category, alert.severity, alert.url
            ),
            3 => warn!(
                "ALERT [{}] [Severity: {}] URL: {}",
                alert.category, alert.severity, alert.url
            ),
            _ => info!(
                "ALERT [{}] [Severity: {}] URL: {}",
                alert.category, alert.severity, alert.url
            ),
        }

        self.alerts.push(alert);
        Ok(())
    }

    /// Filtered alerts, newest first. Alerts sharing a timestamp come out in
    /// reverse write order.
    pub fn query(
        &self,
        category: Option<&str>,
        min_severity: Option<u8>,
        limit: Option<usize>,
    ) -> Vec<Alert> {
        let mut filtered: Vec<Alert> = self
            .alerts
            .iter()
            .rev()
            .filter(|a| category.is_none_or(|c| a.category == c))
            .filter(|a| min_severity.is_none_or(|s| a.severity >= s))
            .cloned()
            .collect();

        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if let Some(limit) = limit {
            filtered.truncate(limit);
        }
        filtered
    }

    pub fn stats(&self) -> AlertStats {
        let mut per_category = BTreeMap::new();
        let mut per_severity: BTreeMap<u8, usize> = (1..=5).map(|s| (s, 0)).collect();

        for alert in &self.alerts {
            *per_category.entry(alert.category.clone()).or_insert(0) += 1;
            *per_severity.entry(alert.severity).or_insert(0) += 1;
        }

        AlertStats {
            total: self.alerts.len(),
            per_category,
            per_severity,
        }
    }
}
