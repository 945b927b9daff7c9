pub mod detail;
pub mod dom;
pub mod listing;


pub use detail::{SellerTable, SkippedRow};

use crate::error::{DetailParseError, ListingParseError};
use crate::plan::SearchPlanItem;
use crate::results::ProductSummary;
use scraper::Html;

/// Entry point for parsing fetched page bodies.
///
/// Every call builds and drops its own document tree, so callers only ever
/// hold the raw body and the extracted values.
pub struct Parser;

impl Parser {
    /// Parses a listing page into the summary of its first product
    pub fn listing(body: &str, item: &SearchPlanItem) -> Result<ProductSummary, ListingParseError> {
        let document = Html::parse_document(body);
        listing::extract(&document, item)
    }

    /// Parses a detail page's seller comparison table
    pub fn detail(body: &str) -> Result<SellerTable, DetailParseError> {
        let document = Html::parse_document(body);
        detail::extract(&document)
    }
}
