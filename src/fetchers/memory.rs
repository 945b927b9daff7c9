use super::fetcher::{PageFetcher, non_empty_body};
use super::Page;
use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct State {
    pages: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    requests: Vec<String>,
}

/// Serves canned pages by URL. Unknown URLs fail with `FetchError::NotFound`.
#[derive(Default)]
pub struct MemoryFetcher {
    state: Mutex<State>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_page(&self, url: &str, body: &str) {
        self.state()
            .pages
            .insert(url.to_string(), body.to_string());
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.add_page(url, body);
        self
    }

    /// Delays every fetch of `url` by `delay`
    pub fn with_delay(self, url: &str, delay: Duration) -> Self {
        self.state().delays.insert(url.to_string(), delay);
        self
    }

    /// URLs requested so far, in call order
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }
}

#[async_trait]
impl PageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let (body, delay) = {
            let mut state = self.state();
            state.requests.push(url.to_string());
            (state.pages.get(url).cloned(), state.delays.get(url).copied())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match body {
            Some(body) => non_empty_body(url, body),
            None => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
        }
    }
}
