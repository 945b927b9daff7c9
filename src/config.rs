use crate::error::LoadError;
use crate::fetchers::http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::fetchers::web::DEFAULT_WEBDRIVER_URL;
use crate::plan::Site;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of the configured sites
pub trait SiteSource {
    fn sites(&self) -> Vec<Site>;
}

/// Source of the configured search phrases
pub trait SearchPhraseSource {
    fn search_phrases(&self) -> Vec<String>;
}

impl SiteSource for Vec<Site> {
    fn sites(&self) -> Vec<Site> {
        self.clone()
    }
}

impl SearchPhraseSource for Vec<String> {
    fn search_phrases(&self) -> Vec<String> {
        self.clone()
    }
}

/// How pages are retrieved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FetcherConfig {
    /// Plain HTTP GET
    #[serde(rename_all = "camelCase")]
    Http {
        #[serde(default = "default_user_agent")]
        user_agent: String,

        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// A browser session driven over WebDriver
    #[serde(rename_all = "camelCase")]
    WebDriver {
        #[serde(default = "default_webdriver_url")]
        webdriver_url: String,
    },

    /// Pages saved by an earlier run
    File { dir: PathBuf },
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig::Http {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Configuration of a scan run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Sites to search
    #[serde(default)]
    pub sites: Vec<Site>,

    /// Phrases searched on every site
    #[serde(default)]
    pub search_phrases: Vec<String>,

    /// Maximum number of plan items processed at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for one plan item, both fetches included
    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Directory where every fetched page is saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            search_phrases: Vec::new(),
            max_concurrency: default_max_concurrency(),
            item_timeout_secs: default_item_timeout_secs(),
            fetcher: FetcherConfig::default(),
            snapshot_dir: None,
        }
    }
}

impl ScanConfig {
    /// Loads configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Loads configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would fail every plan item
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.item_timeout_secs == 0 {
            return Err(LoadError::Invalid {
                field: "itemTimeoutSecs",
                reason: "must be at least 1 second",
            });
        }
        Ok(())
    }
}

impl SiteSource for ScanConfig {
    fn sites(&self) -> Vec<Site> {
        self.sites.clone()
    }
}

impl SearchPhraseSource for ScanConfig {
    fn search_phrases(&self) -> Vec<String> {
        self.search_phrases.clone()
    }
}

fn default_max_concurrency() -> usize {
    4
}

fn default_item_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}
