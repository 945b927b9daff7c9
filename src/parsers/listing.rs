//! Listing page extraction.
//!
//! The result page nests every product under a fixed chain of containers:
//!
//! ```text
//! div.sh-sr__shop-result-group
//!   div.sh-pr__product-results
//!     div.sh-dlr__list-result
//!       div.sh-dlr__content
//!         div.ZGFjDb            (product wrapper, holds div.eIuuYe > a)
//! ```
//!
//! The price block `div.na4ICd` has no named neighbours. The four fields that
//! follow it are found by position among its next element siblings.

use super::dom::{self, css};
use crate::error::{ListingField, ListingParseError};
use crate::plan::SearchPlanItem;
use crate::results::{ProductSummary, Status};
use crate::utils::join_host;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static SHOP_RESULTS: LazyLock<Selector> = LazyLock::new(|| css("div.sh-sr__shop-result-group"));
static PRODUCT_RESULTS: LazyLock<Selector> = LazyLock::new(|| css("div.sh-pr__product-results"));
static RESULT_ROW: LazyLock<Selector> = LazyLock::new(|| css("div.sh-dlr__list-result"));
static RESULT_CONTENT: LazyLock<Selector> = LazyLock::new(|| css("div.sh-dlr__content"));
static PRODUCT_WRAPPER: LazyLock<Selector> = LazyLock::new(|| css("div.ZGFjDb"));
static PRODUCT_NAME: LazyLock<Selector> = LazyLock::new(|| css("div.eIuuYe"));
static LINK: LazyLock<Selector> = LazyLock::new(|| css("a[href]"));
static PRICE_BLOCK: LazyLock<Selector> = LazyLock::new(|| css("div.na4ICd"));
static RATING: LazyLock<Selector> = LazyLock::new(|| css("span.o0Xcvc div.vq3ore"));

const RATING_LABEL_ATTR: &str = "aria-label";

/// Positions of the fields that follow the price block
const REVIEW_COUNT_OFFSET: usize = 1;
const LONG_DESCRIPTION_OFFSET: usize = 2;
const CATEGORIES_OFFSET: usize = 3;
const OTHER_OPTIONS_OFFSET: usize = 4;

/// The blocks found after the price block, in page order
#[derive(Debug, Clone, Copy)]
pub struct PriceSiblings<'a> {
    pub review_count: ElementRef<'a>,
    pub long_description: ElementRef<'a>,
    pub categories: ElementRef<'a>,
    pub other_options: ElementRef<'a>,
}

impl<'a> PriceSiblings<'a> {
    /// Walks forward from the price block. Fails on the first offset the
    /// block does not reach.
    pub fn walk(price_block: ElementRef<'a>) -> Result<Self, ListingParseError> {
        let at = |offset, field| {
            dom::sibling_at(price_block, offset).ok_or(ListingParseError::missing(field))
        };

        Ok(Self {
            review_count: at(REVIEW_COUNT_OFFSET, ListingField::ReviewCount)?,
            long_description: at(LONG_DESCRIPTION_OFFSET, ListingField::LongDescription)?,
            categories: at(CATEGORIES_OFFSET, ListingField::Categories)?,
            other_options: at(OTHER_OPTIONS_OFFSET, ListingField::OtherOptions)?,
        })
    }
}

/// Narrows a selection one level, failing when nothing matches
fn narrow<'a>(
    scopes: &[ElementRef<'a>],
    selector: &Selector,
    field: ListingField,
) -> Result<Vec<ElementRef<'a>>, ListingParseError> {
    let found = dom::select_within(scopes, selector);
    if found.is_empty() {
        return Err(ListingParseError::missing(field));
    }
    Ok(found)
}

/// Extracts the first product of a listing page
pub fn extract(
    document: &Html,
    item: &SearchPlanItem,
) -> Result<ProductSummary, ListingParseError> {
    let root = [document.root_element()];
    let shop_results = narrow(&root, &SHOP_RESULTS, ListingField::ShopResults)?;
    let product_results = narrow(&shop_results, &PRODUCT_RESULTS, ListingField::ProductResults)?;
    let rows = narrow(&product_results, &RESULT_ROW, ListingField::ResultRow)?;
    let contents = narrow(&rows, &RESULT_CONTENT, ListingField::ResultContent)?;
    let wrappers = narrow(&contents, &PRODUCT_WRAPPER, ListingField::ProductWrapper)?;

    let names = narrow(&wrappers, &PRODUCT_NAME, ListingField::ProductName)?;
    let short_description = dom::text_of(names[0]);

    let href = dom::select_within(&names, &LINK)
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .ok_or(ListingParseError::missing(ListingField::DetailLink))?;

    // The price block is looked up from the product results container,
    // not from inside the wrapper.
    let price_blocks = narrow(&product_results, &PRICE_BLOCK, ListingField::Price)?;
    let price_block = price_blocks[0];
    let siblings = PriceSiblings::walk(price_block)?;

    let rating_label = dom::select_within(&[siblings.review_count], &RATING)
        .first()
        .and_then(|rating| rating.value().attr(RATING_LABEL_ATTR))
        .ok_or(ListingParseError::missing(ListingField::RatingLabel))?
        .to_string();

    let summary = ProductSummary {
        site_name: item.site_name.clone(),
        search_phrase: item.search_phrase.clone(),
        short_description,
        long_description: dom::text_of(siblings.long_description),
        price: dom::text_of(price_block),
        review_count_text: dom::text_of(siblings.review_count),
        rating_label,
        categories_text: dom::text_of(siblings.categories),
        other_options_text: dom::text_of(siblings.other_options),
        detail_page_url: join_host(&item.host_name, href),
        status: Status::Active,
    };

    ::log::debug!(
        "Extracted listing for '{}' on {}: {}",
        item.search_phrase,
        item.site_name,
        summary.short_description
    );

    Ok(summary)
}
