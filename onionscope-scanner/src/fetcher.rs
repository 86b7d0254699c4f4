use crate::error::FetchError;
use crate::extract::{document_text, document_title};
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use scraper::Html;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default SOCKS endpoint of a local Tor daemon. `socks5h` keeps DNS inside
/// the proxy, which `.onion` names require.
pub const DEFAULT_SOCKS_PROXY: &str = "socks5h://127.0.0.1:9050";

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; rv:91.0) Gecko/20100101 Firefox/91.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:102.0) Gecko/20100101 Firefox/102.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.93 Safari/537.36",
];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A page as delivered by a fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub html: String,
    pub text: String,
}

/// Retrieves raw page content for a URL.
#[async_trait]
pub trait Fetcher: Send {
    async fn fetch(&mut self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;

    /// Tear down and rebuild whatever backs this fetcher (client, browser,
    /// circuit). Called once after a failed fetch, before the single retry.
    async fn reset(&mut self) -> Result<(), FetchError>;
}

/// Plain HTTP fetcher that routes every request through a SOCKS proxy.
pub struct HttpFetcher {
    client: Client,
    proxy: Option<String>,
    user_agent_index: usize,
}

impl HttpFetcher {
    /// Build a fetcher. `None` for `proxy` means a direct connection, which
    /// is only useful against local test servers.
    pub fn new(proxy: Option<&str>) -> Result<Self, FetchError> {
        let proxy = proxy.map(str::to_string);
        let client = Self::build_client(proxy.as_deref(), 0)?;
        Ok(Self {
            client,
            proxy,
            user_agent_index: 0,
        })
    }

    pub fn tor() -> Result<Self, FetchError> {
        Self::new(Some(DEFAULT_SOCKS_PROXY))
    }

    pub fn user_agent(&self) -> &'static str {
        USER_AGENTS[self.user_agent_index % USER_AGENTS.len()]
    }

    fn build_client(proxy: Option<&str>, user_agent_index: usize) -> Result<Client, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT),
        );

        let mut builder = Client::builder()
            .user_agent(USER_AGENTS[user_agent_index % USER_AGENTS.len()])
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5));

        if let Some(proxy_url) = proxy {
            if !proxy_url.starts_with("socks5://") && !proxy_url.starts_with("socks5h://") {
                return Err(FetchError::Unavailable(format!(
                    "Invalid SOCKS proxy URL '{}'. Must start with socks5:// or socks5h://",
                    proxy_url
                )));
            }
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| FetchError::Unavailable(format!("Invalid SOCKS proxy '{}': {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }

    fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(timeout)
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else {
            FetchError::HttpError(error)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&mut self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        debug!("Fetching {} as '{}'", parsed, self.user_agent());

        let response = self
            .client
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::classify_error(e, timeout))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Blocked(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| Self::classify_error(e, timeout))?;

        let document = Html::parse_document(&html);
        Ok(FetchedPage {
            url: final_url,
            title: document_title(&document),
            text: document_text(&document),
            html,
        })
    }

    async fn reset(&mut self) -> Result<(), FetchError> {
        self.user_agent_index = (self.user_agent_index + 1) % USER_AGENTS.len();
        self.client = Self::build_client(self.proxy.as_deref(), self.user_agent_index)?;
        debug!("Rebuilt HTTP client, now using '{}'", self.user_agent());
        Ok(())
    }
}
