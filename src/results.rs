use serde::{Deserialize, Serialize};

/// Record status, as published downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

/// Product summary extracted from a listing page.
///
/// Every text field holds the extracted text as found on the page; prices
/// and ratings are not parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub site_name: String,
    pub search_phrase: String,
    pub short_description: String,
    pub long_description: String,
    pub price: String,
    pub review_count_text: String,
    /// Accessibility label of the rating widget, e.g. "4.5 out of 5 stars"
    pub rating_label: String,
    pub categories_text: String,
    pub other_options_text: String,
    #[serde(rename = "detailPageURL")]
    pub detail_page_url: String,
    pub status: Status,
}

/// One row of a detail page's seller comparison table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRecord {
    pub seller_name: String,
    pub rating_index: String,
    pub details: String,
    pub base_price: String,
    pub total_price: String,
    pub status: Status,
}

/// The unit published downstream: a summary plus its sellers.
///
/// `sellers` is empty when the seller table had no valid rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResult {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub sellers: Vec<SellerRecord>,
}

impl ProductResult {
    /// Attaches the seller list to a summary and marks the result active
    pub fn assemble(mut summary: ProductSummary, sellers: Vec<SellerRecord>) -> Self {
        summary.status = Status::Active;
        Self { summary, sellers }
    }
}
