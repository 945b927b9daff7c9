//! Runs the search plan: listing fetch, listing parse, detail fetch, detail
//! parse, assemble, publish. One task per plan item, bounded by a semaphore.

use crate::config::{ScanConfig, SearchPhraseSource, SiteSource};
use crate::error::ScanError;
use crate::fetchers::PageFetcher;
use crate::parsers::Parser;
use crate::plan::{PlanEntry, SearchPlanItem, build_plan};
use crate::results::ProductResult;
use crate::sinks::ResultSink;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::timeout;

/// What happened to one plan item
#[derive(Debug)]
pub struct ItemOutcome {
    /// Position in the plan
    pub index: usize,
    pub site_name: String,
    pub search_phrase: String,
    /// Seller rows skipped as malformed
    pub skipped_rows: usize,
    pub result: Result<ProductResult, ScanError>,
}

impl ItemOutcome {
    fn failed(index: usize, site_name: String, search_phrase: String, error: ScanError) -> Self {
        Self {
            index,
            site_name,
            search_phrase,
            skipped_rows: 0,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a scan, in plan order
#[derive(Debug, Default)]
pub struct ScanReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl ScanReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ItemOutcome, &ScanError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }
}

/// A successful pipeline run before publication
struct Scanned {
    result: ProductResult,
    skipped_rows: usize,
}

/// Processes search plans with an injected fetcher and sink
pub struct Scanner {
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn ResultSink>,
    max_concurrency: usize,
    item_timeout: Duration,
}

impl Scanner {
    pub fn new(fetcher: Arc<dyn PageFetcher>, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            fetcher,
            sink,
            max_concurrency: 4,
            item_timeout: Duration::from_secs(120),
        }
    }

    /// Sets the maximum number of plan items processed at once, kept
    /// between 1 and the semaphore's permit limit
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Sets the deadline for fetching and parsing one plan item
    pub fn with_item_timeout(mut self, item_timeout: Duration) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    /// Applies the concurrency and deadline settings of a configuration
    pub fn with_config(self, config: &ScanConfig) -> Self {
        self.with_max_concurrency(config.max_concurrency)
            .with_item_timeout(Duration::from_secs(config.item_timeout_secs))
    }

    /// Builds the plan from the configured sources and processes all of it
    pub async fn scan(
        &self,
        sites: &impl SiteSource,
        phrases: &impl SearchPhraseSource,
    ) -> ScanReport {
        let plan = build_plan(&sites.sites(), &phrases.search_phrases());
        self.run(plan).await
    }

    /// Processes every plan entry and waits for all of them
    pub async fn run(&self, plan: Vec<PlanEntry>) -> ScanReport {
        let started = Instant::now();
        ::log::info!("Starting scan of {} plan items", plan.len());

        let mut rx = self.start(plan);
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| o.index);

        let report = ScanReport { outcomes };
        ::log::info!(
            "Scan complete - {} of {} items published in {:.2} seconds",
            report.succeeded(),
            report.total(),
            started.elapsed().as_secs_f64()
        );
        report
    }

    /// Starts processing a plan and returns a receiver that yields each
    /// outcome as its item finishes. Completion order is not plan order.
    ///
    /// Every plan entry yields exactly one outcome, including items whose
    /// task panicked.
    pub fn start(&self, plan: Vec<PlanEntry>) -> mpsc::Receiver<ItemOutcome> {
        let (outcome_tx, outcome_rx) = mpsc::channel(plan.len().max(1));
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut running = HashMap::new();

        for (index, entry) in plan.into_iter().enumerate() {
            let item = match entry {
                Ok(item) => item,
                Err(rejected) => {
                    let outcome = ItemOutcome::failed(
                        index,
                        rejected.error.site().to_string(),
                        rejected.search_phrase,
                        ScanError::Config(rejected.error),
                    );
                    // Capacity covers the whole plan, so this cannot block.
                    if outcome_tx.try_send(outcome).is_err() {
                        ::log::error!("Outcome channel closed before item {}", index);
                    }
                    continue;
                }
            };

            let identity = (index, item.site_name.clone(), item.search_phrase.clone());
            let handle = tasks.spawn(process_item(
                index,
                item,
                Arc::clone(&self.fetcher),
                Arc::clone(&self.sink),
                Arc::clone(&permits),
                self.item_timeout,
            ));
            running.insert(handle.id(), identity);
        }

        tokio::spawn(collect_outcomes(tasks, running, outcome_tx));
        outcome_rx
    }
}

/// Forwards finished items to the outcome channel. A task that died
/// without an outcome is reported as a failure of its own item.
async fn collect_outcomes(
    mut tasks: JoinSet<ItemOutcome>,
    mut running: HashMap<tokio::task::Id, (usize, String, String)>,
    outcome_tx: mpsc::Sender<ItemOutcome>,
) {
    while let Some(joined) = tasks.join_next_with_id().await {
        let outcome = match joined {
            Ok((id, outcome)) => {
                running.remove(&id);
                outcome
            }
            Err(e) => {
                let Some((index, site_name, search_phrase)) = running.remove(&e.id()) else {
                    ::log::error!("Unknown item task failed: {}", e);
                    continue;
                };
                ::log::error!(
                    "Item {} ('{}' on {}) stopped unexpectedly: {}",
                    index,
                    search_phrase,
                    site_name,
                    e
                );
                let error = ScanError::Task(e.to_string());
                ItemOutcome::failed(index, site_name, search_phrase, error)
            }
        };

        if let Err(e) = outcome_tx.send(outcome).await {
            ::log::error!("Failed to report outcome of item {}: {}", e.0.index, e);
        }
    }
}

/// Runs the pipeline for one plan item once a permit is free
async fn process_item(
    index: usize,
    item: SearchPlanItem,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn ResultSink>,
    permits: Arc<Semaphore>,
    item_timeout: Duration,
) -> ItemOutcome {
    // The semaphore is never closed, so acquiring cannot fail.
    let _permit = permits.acquire_owned().await.ok();
    ::log::debug!(
        "Item {} started: '{}' on {}",
        index,
        item.search_phrase,
        item.site_name
    );

    let scanned = match timeout(item_timeout, scan_item(fetcher.as_ref(), &item)).await {
        Ok(scanned) => scanned,
        Err(_) => Err(ScanError::Deadline(item_timeout)),
    };

    let (skipped_rows, result) = match scanned {
        Ok(Scanned {
            result,
            skipped_rows,
        }) => match sink.publish(&result).await {
            Ok(()) => (skipped_rows, Ok(result)),
            Err(e) => (skipped_rows, Err(ScanError::Publish(e))),
        },
        Err(e) => (0, Err(e)),
    };

    match &result {
        Ok(_) => ::log::info!(
            "Item {} published: '{}' on {}",
            index,
            item.search_phrase,
            item.site_name
        ),
        Err(e) => ::log::error!(
            "Item {} failed ('{}' on {}): {}",
            index,
            item.search_phrase,
            item.site_name,
            e
        ),
    }

    ItemOutcome {
        index,
        site_name: item.site_name,
        search_phrase: item.search_phrase,
        skipped_rows,
        result,
    }
}

/// Fetches and parses one plan item. Documents are parsed inside the
/// synchronous parser calls and never held across an await.
async fn scan_item(
    fetcher: &dyn PageFetcher,
    item: &SearchPlanItem,
) -> Result<Scanned, ScanError> {
    let listing = fetcher.fetch(&item.full_url).await?;
    let summary = Parser::listing(&listing.body, item)?;

    let detail = fetcher.fetch(&summary.detail_page_url).await?;
    let table = Parser::detail(&detail.body)?;

    Ok(Scanned {
        skipped_rows: table.skipped.len(),
        result: ProductResult::assemble(summary, table.sellers),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ListingField};
    use crate::fetchers::{MemoryFetcher, Page};
    use crate::parsers::tests::fixtures::{LISTING_PAGE, detail_page, seller_row};
    use crate::plan::Site;
    use crate::sinks::MemorySink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a listing for every search URL and a one-seller detail page
    /// otherwise, recording the most fetches ever in progress at once
    #[derive(Default)]
    struct CountingFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let body = if url.contains("/search?") {
                listing_linking_to("item")
            } else {
                detail_page(&[seller_row("Shop A", 6)])
            };
            Ok(Page::new(url, body))
        }
    }

    /// Panics when asked for one URL, serves canned pages for the rest
    struct CrashingFetcher {
        pages: MemoryFetcher,
        crash_on: String,
    }

    #[async_trait]
    impl PageFetcher for CrashingFetcher {
        async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
            if url == self.crash_on {
                panic!("fetcher crashed on {url}");
            }
            self.pages.fetch(url).await
        }
    }

    const DETAIL_URL: &str = "https://shop.example/shopping/product/123?q=men+shampoo";

    fn site() -> Site {
        Site::new(
            "ExampleShop",
            "https://shop.example",
            "/search?q={0}&mode=list",
        )
    }

    fn listing_url(phrase: &str) -> String {
        format!("https://shop.example/search?q={}&mode=list", phrase)
    }

    /// A listing page whose product links to `/p/<slug>`
    fn listing_linking_to(slug: &str) -> String {
        LISTING_PAGE.replacen("/shopping/product/123?q=men+shampoo", &format!("/p/{slug}"), 1)
    }

    fn scanner(fetcher: MemoryFetcher, sink: Arc<MemorySink>) -> Scanner {
        Scanner::new(Arc::new(fetcher), sink).with_max_concurrency(2)
    }

    #[tokio::test]
    async fn test_single_item_end_to_end() {
        let fetcher = MemoryFetcher::new()
            .with_page(&listing_url("men+shampoo"), LISTING_PAGE)
            .with_page(
                DETAIL_URL,
                &detail_page(&[
                    seller_row("Shop A", 6),
                    seller_row("Shop B", 4),
                    seller_row("Shop C", 6),
                ]),
            );
        let sink = Arc::new(MemorySink::new());

        let report = scanner(fetcher, sink.clone())
            .scan(&vec![site()], &vec!["men shampoo".to_string()])
            .await;

        assert_eq!(report.total(), 1);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.outcomes[0].skipped_rows, 1);

        let published = sink.results();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].summary.price, "£4.99");
        assert_eq!(published[0].sellers.len(), 2);
    }

    #[tokio::test]
    async fn test_whole_plan_is_processed() {
        let phrases = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let fetcher = MemoryFetcher::new();
        for phrase in &phrases {
            fetcher.add_page(&listing_url(phrase), &listing_linking_to(phrase));
            fetcher.add_page(
                &format!("https://shop.example/p/{phrase}"),
                &detail_page(&[seller_row(&format!("Seller {phrase}"), 6)]),
            );
        }
        let sink = Arc::new(MemorySink::new());

        let report = scanner(fetcher, sink.clone()).scan(&vec![site()], &phrases).await;

        assert_eq!(report.succeeded(), 3);
        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let mut sellers: Vec<String> = sink
            .results()
            .iter()
            .map(|r| r.sellers[0].seller_name.clone())
            .collect();
        sellers.sort();
        assert_eq!(sellers, vec!["Seller a", "Seller b", "Seller c"]);
    }

    #[tokio::test]
    async fn test_detail_failure_does_not_leak_into_next_item() {
        let fetcher = MemoryFetcher::new()
            .with_page(&listing_url("a"), &listing_linking_to("a"))
            .with_page(&listing_url("b"), &listing_linking_to("b"))
            .with_page(
                "https://shop.example/p/b",
                &detail_page(&[seller_row("Only B", 6)]),
            );
        let sink = Arc::new(MemorySink::new());

        let report = scanner(fetcher, sink.clone())
            .scan(&vec![site()], &vec!["a".to_string(), "b".to_string()])
            .await;

        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes[0].result,
            Err(ScanError::Fetch(FetchError::NotFound { .. }))
        ));

        let second = report.outcomes[1].result.as_ref().unwrap();
        assert_eq!(second.sellers.len(), 1);
        assert_eq!(second.sellers[0].seller_name, "Only B");
        assert_eq!(sink.results().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_parse_failure_is_reported() {
        let fetcher =
            MemoryFetcher::new().with_page(&listing_url("x"), "<html><body></body></html>");
        let sink = Arc::new(MemorySink::new());

        let report = scanner(fetcher, sink.clone())
            .scan(&vec![site()], &vec!["x".to_string()])
            .await;

        match &report.outcomes[0].result {
            Err(ScanError::Listing(e)) => assert_eq!(e.field, ListingField::ShopResults),
            other => panic!("expected a listing error, got {other:?}"),
        }
        assert!(sink.results().is_empty());
    }

    #[tokio::test]
    async fn test_config_error_fails_only_its_site() {
        let sites = vec![
            Site::new("Broken", "https://broken.example", "/search"),
            site(),
        ];
        let fetcher = MemoryFetcher::new()
            .with_page(&listing_url("men+shampoo"), LISTING_PAGE)
            .with_page(DETAIL_URL, &detail_page(&[seller_row("Shop A", 6)]));
        let sink = Arc::new(MemorySink::new());

        let report = scanner(fetcher, sink.clone())
            .scan(&sites, &vec!["men shampoo".to_string()])
            .await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.outcomes[0].site_name, "Broken");
        assert_eq!(report.outcomes[0].search_phrase, "men shampoo");
        assert!(matches!(
            report.outcomes[0].result,
            Err(ScanError::Config(_))
        ));
        assert!(report.outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_rejected_site_outcomes_keep_their_phrases() {
        let sites = vec![Site::new("Broken", "https://broken.example", "/q={1}")];
        let phrases = vec!["one".to_string(), "two".to_string()];
        let sink = Arc::new(MemorySink::new());

        let report = scanner(MemoryFetcher::new(), sink).scan(&sites, &phrases).await;

        let failed: Vec<(&str, &str)> = report
            .outcomes
            .iter()
            .map(|o| (o.site_name.as_str(), o.search_phrase.as_str()))
            .collect();
        assert_eq!(failed, vec![("Broken", "one"), ("Broken", "two")]);
        assert_eq!(report.failed(), 2);
    }

    #[tokio::test]
    async fn test_items_in_flight_never_exceed_limit() {
        let fetcher = Arc::new(CountingFetcher::default());
        let sink = Arc::new(MemorySink::new());
        let phrases: Vec<String> = (0..6).map(|i| format!("phrase {i}")).collect();

        let report = Scanner::new(fetcher.clone(), sink.clone())
            .with_max_concurrency(2)
            .scan(&vec![site()], &phrases)
            .await;

        assert_eq!(report.succeeded(), 6);
        assert_eq!(sink.results().len(), 6);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrency_above_permit_limit_is_clamped() {
        let fetcher = MemoryFetcher::new()
            .with_page(&listing_url("men+shampoo"), LISTING_PAGE)
            .with_page(DETAIL_URL, &detail_page(&[seller_row("Shop A", 6)]));
        let sink = Arc::new(MemorySink::new());

        let report = Scanner::new(Arc::new(fetcher), sink)
            .with_max_concurrency(usize::MAX)
            .scan(&vec![site()], &vec!["men shampoo".to_string()])
            .await;

        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_crashed_item_is_reported() {
        let pages = MemoryFetcher::new()
            .with_page(&listing_url("fine"), &listing_linking_to("fine"))
            .with_page(
                "https://shop.example/p/fine",
                &detail_page(&[seller_row("Fine", 6)]),
            );
        let fetcher = CrashingFetcher {
            pages,
            crash_on: listing_url("boom"),
        };
        let sink = Arc::new(MemorySink::new());

        let report = Scanner::new(Arc::new(fetcher), sink.clone())
            .scan(&vec![site()], &vec!["boom".to_string(), "fine".to_string()])
            .await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.outcomes[0].search_phrase, "boom");
        assert!(matches!(
            report.outcomes[0].result,
            Err(ScanError::Task(_))
        ));
        assert!(report.outcomes[1].is_success());
        assert_eq!(sink.results().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_is_not_fatal() {
        let fetcher = MemoryFetcher::new()
            .with_page(&listing_url("men+shampoo"), LISTING_PAGE)
            .with_page(DETAIL_URL, &detail_page(&[seller_row("Shop A", 6)]));
        let sink = Arc::new(MemorySink::rejecting());

        let report = scanner(fetcher, sink)
            .scan(&vec![site()], &vec!["men shampoo".to_string()])
            .await;

        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes[0].result,
            Err(ScanError::Publish(_))
        ));
    }

    #[tokio::test]
    async fn test_hung_fetch_hits_item_deadline() {
        let fetcher = MemoryFetcher::new()
            .with_page(&listing_url("slow"), &listing_linking_to("slow"))
            .with_delay(&listing_url("slow"), Duration::from_secs(30))
            .with_page(&listing_url("fast"), &listing_linking_to("fast"))
            .with_page(
                "https://shop.example/p/fast",
                &detail_page(&[seller_row("Fast", 6)]),
            );
        let sink = Arc::new(MemorySink::new());

        let report = scanner(fetcher, sink.clone())
            .with_item_timeout(Duration::from_millis(100))
            .scan(&vec![site()], &vec!["slow".to_string(), "fast".to_string()])
            .await;

        assert!(matches!(
            report.outcomes[0].result,
            Err(ScanError::Deadline(_))
        ));
        assert!(report.outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_rerun_on_same_pages_is_identical() {
        let pages = || {
            MemoryFetcher::new()
                .with_page(&listing_url("men+shampoo"), LISTING_PAGE)
                .with_page(DETAIL_URL, &detail_page(&[seller_row("Shop A", 6)]))
        };

        let mut runs = Vec::new();
        for _ in 0..2 {
            let sink = Arc::new(MemorySink::new());
            scanner(pages(), sink.clone())
                .scan(&vec![site()], &vec!["men shampoo".to_string()])
                .await;
            runs.push(serde_json::to_string(&sink.results()).unwrap());
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn test_detail_fetch_waits_for_listing() {
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_page(&listing_url("men+shampoo"), LISTING_PAGE)
                .with_page(DETAIL_URL, &detail_page(&[])),
        );
        let sink = Arc::new(MemorySink::new());

        let report = Scanner::new(fetcher.clone(), sink.clone())
            .scan(&vec![site()], &vec!["men shampoo".to_string()])
            .await;

        assert_eq!(
            fetcher.requests(),
            vec![listing_url("men+shampoo"), DETAIL_URL.to_string()]
        );
        // A table with no seller rows still publishes an empty list.
        assert!(report.outcomes[0].result.as_ref().unwrap().sellers.is_empty());
        assert_eq!(sink.results().len(), 1);
    }
}
