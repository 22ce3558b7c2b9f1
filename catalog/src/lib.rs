//! Minimal client for the "A View in the Dark" catalog page.
//!
//! This crate provides a focused client for the front page that lists where
//! the wandering guilds and shops currently stand:
//! - A single GET of the page with request and connect timeouts
//! - Extraction of the guild and shop tables into `(name, column, row)` rows
//! - The raw "next change" countdown text for each section
//!
//! Interpreting the rows against a street grid is left to the caller.

mod page;

pub use page::{CatalogPage, CatalogRow, MalformedRow, Section, SectionData};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_URL: &str = "https://aviewinthedark.net/";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Catalog request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Catalog returned status {status}")]
    Status { status: u16 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Connection settings for [`CatalogClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Page to fetch.
    pub url: String,

    /// Whole-request timeout.
    pub timeout: Duration,

    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,

    /// User-Agent header sent with the request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Set the page URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Catalog page client.
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Create a client with the given settings.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let headers = build_headers(&config.user_agent)?;
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url,
            timeout: config.timeout,
        })
    }

    /// Create a client pointed at the public catalog with default timeouts.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(ClientConfig::default())
    }

    /// The page this client fetches.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw page markup.
    ///
    /// Non-2xx responses and timeouts are errors; the body of a failed
    /// response is discarded.
    pub async fn fetch_page(&self) -> Result<String, Error> {
        debug!(url = %self.url, "fetching catalog page");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "catalog responded");
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        info!(bytes = body.len(), "fetched catalog page");
        Ok(body)
    }

    /// Fetch and parse the page.
    pub async fn fetch(&self) -> Result<CatalogPage, Error> {
        let markup = self.fetch_page().await?;
        Ok(CatalogPage::parse(&markup))
    }

    fn classify(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Network(error.to_string())
        }
    }
}

fn build_headers(user_agent: &str) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| Error::Config(format!("Invalid user agent: {e}")))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CatalogClient::with_defaults().unwrap();
        assert_eq!(client.url(), DEFAULT_URL);
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::default()
            .with_url("http://localhost:8080/")
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(1))
            .with_user_agent("citymap-test");

        assert_eq!(config.url, "http://localhost:8080/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));

        let client = CatalogClient::new(config).unwrap();
        assert_eq!(client.url(), "http://localhost:8080/");
    }

    #[test]
    fn test_invalid_user_agent() {
        let config = ClientConfig::default().with_user_agent("bad\nagent");
        assert!(matches!(CatalogClient::new(config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let config = ClientConfig::default()
            .with_url("http://127.0.0.1:9/")
            .with_connect_timeout(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(3));
        let client = CatalogClient::new(config).unwrap();

        let result = client.fetch_page().await;
        assert!(matches!(
            result,
            Err(Error::Network(_)) | Err(Error::Timeout(_))
        ));
    }
}
