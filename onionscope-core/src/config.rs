use crate::error::{CrawlError, LoadError};
use onionscope_scanner::fetcher::DEFAULT_SOCKS_PROXY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/onionscope";
pub const DEFAULT_OUTPUT_DIR: &str = "~/.config/onionscope/output";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Everything a crawl run needs, as stored in `config.json`.
///
/// Missing fields take their defaults, so a file holding only
/// `start_urls` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub start_urls: Vec<String>,
    pub max_pages: usize,
    pub max_depth: usize,
    pub rotation_threshold: u32,
    pub inter_request_delay_secs: f64,
    pub alert_confidence_threshold: f64,
    /// `None` enables every known category
    pub enabled_categories: Option<Vec<String>>,
    pub fetch_timeout_secs: u64,
    /// Falls back to the bundled table when unset
    pub keywords_file: Option<PathBuf>,
    pub custom_categories_file: Option<PathBuf>,
    pub output_dir: String,
    pub socks_proxy: String,
    pub control_port: u16,
    pub control_password: Option<String>,
    pub fuzzy_threshold: u8,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_urls: Vec::new(),
            max_pages: 50,
            max_depth: 3,
            rotation_threshold: 10,
            inter_request_delay_secs: 3.0,
            alert_confidence_threshold: 70.0,
            enabled_categories: None,
            fetch_timeout_secs: 120,
            keywords_file: None,
            custom_categories_file: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            socks_proxy: DEFAULT_SOCKS_PROXY.to_string(),
            control_port: 9051,
            control_password: None,
            fuzzy_threshold: 80,
        }
    }
}

impl CrawlConfig {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json + "\n")
    }

    /// Reject parameters no crawl can run with.
    pub fn validate(&self) -> Result<(), CrawlError> {
        let invalid = |msg: &str| Err(CrawlError::InvalidParameter(msg.to_string()));

        if self.start_urls.is_empty() {
            return invalid("at least one start URL is required");
        }
        if self.max_pages == 0 {
            return invalid("max_pages must be greater than 0");
        }
        if self.rotation_threshold == 0 {
            return invalid("rotation_threshold must be greater than 0");
        }
        let delay = self.inter_request_delay_secs;
        if delay.is_nan() || delay.is_infinite() || delay <= 0.0 {
            return invalid("inter_request_delay_secs must be a positive number");
        }
        if !(0.0..=100.0).contains(&self.alert_confidence_threshold) {
            return invalid("alert_confidence_threshold must be within 0..=100");
        }
        if self.fuzzy_threshold > 100 {
            return invalid("fuzzy_threshold must be within 0..=100");
        }
        if self.fetch_timeout_secs == 0 {
            return invalid("fetch_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    /// `output_dir` with a leading `~` expanded.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output_dir).as_ref())
    }

    /// `host:port` of the SOCKS proxy, used to probe the anonymity layer.
    pub fn socks_addr(&self) -> Option<String> {
        let url = Url::parse(&self.socks_proxy).ok()?;
        let host = url.host_str()?;
        let port = url.port().unwrap_or(1080);
        Some(format!("{}:{}", host, port))
    }

    /// Control port on the same host as the SOCKS proxy.
    pub fn control_addr(&self) -> String {
        let host = Url::parse(&self.socks_proxy)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "127.0.0.1".to_string());
        format!("{}:{}", host, self.control_port)
    }
}

/// `~/.config/onionscope` with the tilde expanded.
pub fn default_config_dir() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_DIR).as_ref())
}
