pub mod fetcher;
pub mod file;
pub mod http;
pub mod memory;
pub mod web;

pub use fetcher::{Page, PageFetcher};
pub use file::{FileFetcher, SnapshotFetcher};
pub use http::HttpFetcher;
pub use memory::MemoryFetcher;
pub use web::WebDriverFetcher;

use crate::config::FetcherConfig;
use std::sync::Arc;

/// Builds the fetcher described by the configuration.
///
/// `WEBDRIVER_URL`, when set and non-empty, overrides the configured
/// WebDriver endpoint.
pub fn from_config(config: &FetcherConfig) -> Result<Arc<dyn PageFetcher>, reqwest::Error> {
    let fetcher: Arc<dyn PageFetcher> = match config {
        FetcherConfig::Http {
            user_agent,
            timeout_secs,
        } => Arc::new(HttpFetcher::with_options(user_agent, *timeout_secs)?),
        FetcherConfig::WebDriver { webdriver_url } => {
            let url = match std::env::var("WEBDRIVER_URL") {
                Ok(url) if !url.is_empty() => url,
                _ => webdriver_url.clone(),
            };
            ::log::info!("Fetching through WebDriver at {}", url);
            Arc::new(WebDriverFetcher::new(&url))
        }
        FetcherConfig::File { dir } => {
            ::log::info!("Replaying saved pages from {}", dir.display());
            Arc::new(FileFetcher::new(dir.clone()))
        }
    };
    Ok(fetcher)
}

/// Wraps `fetcher` so every fetched page is saved under `dir`
pub fn with_snapshots(
    fetcher: Arc<dyn PageFetcher>,
    dir: &std::path::Path,
) -> Arc<dyn PageFetcher> {
    ::log::info!("Saving fetched pages to {}", dir.display());
    Arc::new(SnapshotFetcher::new(fetcher, dir))
}
