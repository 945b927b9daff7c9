use super::fetcher::{PageFetcher, non_empty_body};
use super::Page;
use crate::error::FetchError;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use tokio::sync::Mutex;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Common local WebDriver endpoints tried when the configured one is down
const FALLBACK_WEBDRIVER_URLS: [&str; 3] = [
    "http://localhost:9515", // ChromeDriver default
    "http://127.0.0.1:4444",
    "http://localhost:4723", // Appium default
];

/// Fetches pages through a browser session, for result pages that are
/// rendered by script.
///
/// One session is shared; navigation and source retrieval for a URL happen
/// under a lock so concurrent fetches cannot interleave.
pub struct WebDriverFetcher {
    webdriver_url: String,
    client: Mutex<Option<Client>>,
}

impl WebDriverFetcher {
    /// The session is opened lazily on the first fetch
    pub fn new(webdriver_url: &str) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            client: Mutex::new(None),
        }
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    /// Ends the browser session, if one was opened
    pub async fn close(&self) {
        if let Some(client) = self.client.lock().await.take() {
            if let Err(e) = client.close().await {
                ::log::warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }

    async fn connect(&self, url: &str) -> Result<Client, FetchError> {
        match ClientBuilder::native().connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
                return Ok(client);
            }
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
            }
        }

        for fallback in FALLBACK_WEBDRIVER_URLS {
            if fallback == self.webdriver_url {
                continue;
            }
            ::log::info!("Trying fallback WebDriver URL: {}", fallback);
            if let Ok(client) = ClientBuilder::native().connect(fallback).await {
                ::log::debug!("Connected to fallback WebDriver at {}", fallback);
                return Ok(client);
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(FetchError::WebDriver {
            url: url.to_string(),
            context: "connecting for",
            message: format!("no WebDriver server reachable at {}", self.webdriver_url),
        })
    }

    async fn load(client: &Client, url: &str) -> Result<String, FetchError> {
        client
            .goto(url)
            .await
            .map_err(|e| navigation_error(e, "navigating to", url))?;
        client
            .source()
            .await
            .map_err(|e| navigation_error(e, "reading source of", url))
    }
}

fn navigation_error(
    error: fantoccini::error::CmdError,
    context: &'static str,
    url: &str,
) -> FetchError {
    FetchError::WebDriver {
        url: url.to_string(),
        context,
        message: error.to_string(),
    }
}

fn is_lost_session(error: &FetchError) -> bool {
    matches!(
        error,
        FetchError::WebDriver { message, .. }
            if message.contains("Unable to find session") || message.contains("invalid session id")
    )
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let mut guard = self.client.lock().await;

        let client = match guard.take() {
            Some(client) => client,
            None => self.connect(url).await?,
        };

        let loaded = Self::load(&client, url).await;
        let (client, result) = match loaded {
            Err(e) if is_lost_session(&e) => {
                ::log::warn!("Lost WebDriver session while loading {}, reconnecting", url);
                let fresh = self.connect(url).await?;
                let result = Self::load(&fresh, url).await;
                (fresh, result)
            }
            other => (client, other),
        };

        *guard = Some(client);
        let source = result?;
        ::log::debug!("Loaded {} bytes of source from {}", source.len(), url);
        non_empty_body(url, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lost_session_detection() {
        let lost = FetchError::WebDriver {
            url: "u".to_string(),
            context: "navigating to",
            message: "Unable to find session with ID abc".to_string(),
        };
        let other = FetchError::WebDriver {
            url: "u".to_string(),
            context: "navigating to",
            message: "timeout".to_string(),
        };
        assert!(is_lost_session(&lost));
        assert!(!is_lost_session(&other));
        assert!(!is_lost_session(&FetchError::NotFound { url: "u".into() }));
    }
}
