#![allow(clippy::too_many_arguments)]

//! Extracts product summaries and seller tables from shopping search results.
//!
//! A scan turns configured sites and search phrases into a plan, fetches each
//! listing page, follows the first product to its detail page and publishes
//! the combined result to a sink.

pub mod config;
pub mod error;
pub mod fetchers;
pub mod parsers;
pub mod plan;
pub mod results;
pub mod scanner;
pub mod sinks;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::ScanConfig;
pub use error::{FetchError, ListingParseError, ScanError};
pub use plan::{PlanEntry, RejectedItem, SearchPlanItem, Site, build_plan};
pub use results::{ProductResult, ProductSummary, SellerRecord, Status};
pub use scanner::{ItemOutcome, ScanReport, Scanner};

use sinks::ResultSink;
use std::sync::Arc;

/// Runs a complete scan as described by `config`, publishing to `sink`.
///
/// Fails only when the configured fetcher cannot be created; per-item
/// failures are reported in the returned `ScanReport`.
pub async fn scan_with_config(
    config: &ScanConfig,
    sink: Arc<dyn ResultSink>,
) -> Result<ScanReport, reqwest::Error> {
    let mut fetcher = fetchers::from_config(&config.fetcher)?;
    if let Some(dir) = &config.snapshot_dir {
        fetcher = fetchers::with_snapshots(fetcher, dir);
    }

    let scanner = Scanner::new(fetcher, sink).with_config(config);
    Ok(scanner.scan(config, config).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetcherConfig;
    use crate::fetchers::file::snapshot_path;
    use crate::parsers::tests::fixtures::{LISTING_PAGE, detail_page, seller_row};
    use crate::sinks::MemorySink;

    #[tokio::test]
    async fn test_replay_from_saved_pages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            snapshot_path(dir.path(), "https://shop.example/search?q=men+shampoo&mode=list"),
            LISTING_PAGE,
        )
        .unwrap();
        std::fs::write(
            snapshot_path(
                dir.path(),
                "https://shop.example/shopping/product/123?q=men+shampoo",
            ),
            detail_page(&[seller_row("Shop A", 6)]),
        )
        .unwrap();

        let config = ScanConfig {
            sites: vec![Site::new(
                "ExampleShop",
                "https://shop.example",
                "/search?q={0}&mode=list",
            )],
            search_phrases: vec!["men shampoo".to_string(), "beard oil".to_string()],
            fetcher: FetcherConfig::File {
                dir: dir.path().to_path_buf(),
            },
            ..ScanConfig::default()
        };
        let sink = Arc::new(MemorySink::new());

        let report = scan_with_config(&config, sink.clone()).await.unwrap();

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);
        assert!(matches!(
            report.outcomes[1].result,
            Err(ScanError::Fetch(FetchError::NotFound { .. }))
        ));
        assert_eq!(sink.results()[0].sellers[0].seller_name, "Shop A");
    }
}
