//! Error types for every stage of a scan.
//!
//! Each plan item either produces a `ProductResult` or a `ScanError`; none of
//! these errors stop the scan as a whole.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A site's search template could not be turned into a search path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("site '{site}': search template has no {{0}} placeholder")]
    MissingPlaceholder { site: String },

    #[error("site '{site}': search template has {count} placeholders, expected exactly one")]
    MultiplePlaceholders { site: String, count: usize },

    #[error("site '{site}': unsupported placeholder '{placeholder}', expected {{0}}")]
    UnsupportedPlaceholder { site: String, placeholder: String },

    #[error("site '{site}': unbalanced brace in search template")]
    UnbalancedBrace { site: String },
}

impl ConfigError {
    /// Name of the site whose template was rejected
    pub fn site(&self) -> &str {
        match self {
            ConfigError::MissingPlaceholder { site }
            | ConfigError::MultiplePlaceholders { site, .. }
            | ConfigError::UnsupportedPlaceholder { site, .. }
            | ConfigError::UnbalancedBrace { site } => site,
        }
    }
}

/// A page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unusable body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("webdriver error while {context} {url}: {message}")]
    WebDriver {
        url: String,
        context: &'static str,
        message: String,
    },

    #[error("no stored page for {url}")]
    NotFound { url: String },

    #[error("i/o error for {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fetching {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// The fields the listing extractor has to find, in extraction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingField {
    ShopResults,
    ProductResults,
    ResultRow,
    ResultContent,
    ProductWrapper,
    ProductName,
    DetailLink,
    Price,
    ReviewCount,
    RatingLabel,
    LongDescription,
    Categories,
    OtherOptions,
}

impl ListingField {
    pub fn name(&self) -> &'static str {
        match self {
            ListingField::ShopResults => "shop results",
            ListingField::ProductResults => "product results",
            ListingField::ResultRow => "result row",
            ListingField::ResultContent => "result content",
            ListingField::ProductWrapper => "product wrapper",
            ListingField::ProductName => "product name",
            ListingField::DetailLink => "detail link",
            ListingField::Price => "price",
            ListingField::ReviewCount => "review count",
            ListingField::RatingLabel => "rating label",
            ListingField::LongDescription => "long description",
            ListingField::Categories => "categories",
            ListingField::OtherOptions => "other options",
        }
    }
}

impl fmt::Display for ListingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A required element was absent from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing listing field: {field}")]
pub struct ListingParseError {
    pub field: ListingField,
}

impl ListingParseError {
    pub fn missing(field: ListingField) -> Self {
        Self { field }
    }
}

/// The detail page does not contain the seller container chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("detail page is missing '{missing}'")]
pub struct DetailParseError {
    pub missing: &'static str,
}

/// A result could not be handed to the downstream sink.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to deliver result: {0}")]
    Transport(String),
}

impl From<std::io::Error> for PublishError {
    fn from(e: std::io::Error) -> Self {
        PublishError::Transport(e.to_string())
    }
}

/// Why a single plan item produced no published result.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Listing(#[from] ListingParseError),

    #[error(transparent)]
    Detail(#[from] DetailParseError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("item did not finish within {0:?}")]
    Deadline(Duration),

    #[error("item task stopped unexpectedly: {0}")]
    Task(String),
}

/// The scan configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
