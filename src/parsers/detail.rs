use super::dom::{self, css};
use crate::error::DetailParseError;
use crate::results::{SellerRecord, Status};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Element ids leading from the page body to the sellers section, outermost first
pub const CONTAINER_CHAIN: [&str; 5] = [
    "main-content-with-search",
    "pp-main",
    "online",
    "os-content",
    "os-sellers-content",
];

/// A row needs this many cells to be read as a seller
pub const MIN_SELLER_CELLS: usize = 6;

static CONTAINERS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    CONTAINER_CHAIN
        .iter()
        .map(|id| {
            let selector = Selector::parse(&format!("#{id}"))
                .unwrap_or_else(|e| panic!("invalid id selector {id:?}: {e}"));
            (*id, selector)
        })
        .collect()
});
static SELLER_TABLE: LazyLock<Selector> = LazyLock::new(|| css("table.os-main-table"));
static TABLE_BODY: LazyLock<Selector> = LazyLock::new(|| css("tbody"));
static TABLE_ROW: LazyLock<Selector> = LazyLock::new(|| css("tr"));

/// A table row that was not read as a seller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Row position in the table body, header row is 0
    pub index: usize,
    pub cell_count: usize,
    pub text: String,
}

/// Sellers read from a detail page, plus the rows that were skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerTable {
    pub sellers: Vec<SellerRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Descends the id chain to the sellers container
fn sellers_container(document: &Html) -> Result<ElementRef<'_>, DetailParseError> {
    let mut scope = document.root_element();
    for (id, selector) in CONTAINERS.iter() {
        scope = scope
            .select(selector)
            .next()
            .ok_or(DetailParseError { missing: *id })?;
    }
    Ok(scope)
}

/// Reads one row. `None` when it has too few cells.
fn seller_from_row(row: ElementRef<'_>) -> Option<SellerRecord> {
    let cells = dom::child_elements(row);
    if cells.len() < MIN_SELLER_CELLS {
        return None;
    }

    Some(SellerRecord {
        seller_name: dom::text_of(cells[0]),
        rating_index: dom::text_of(cells[1]),
        details: dom::text_of(cells[2]),
        base_price: dom::text_of(cells[3]),
        total_price: dom::text_of(cells[4]),
        status: Status::Active,
    })
}

/// Extracts the seller comparison table of a detail page.
///
/// The first row is the header. Rows with fewer than six cells are logged
/// and recorded in `skipped`; they never fail the page.
pub fn extract(document: &Html) -> Result<SellerTable, DetailParseError> {
    let container = sellers_container(document)?;
    let tables = dom::select_within(&[container], &SELLER_TABLE);
    let bodies = dom::select_within(&tables, &TABLE_BODY);
    let rows = dom::select_within(&bodies, &TABLE_ROW);

    let mut table = SellerTable::default();
    for (index, row) in rows.into_iter().enumerate().skip(1) {
        match seller_from_row(row) {
            Some(seller) => table.sellers.push(seller),
            None => {
                let skipped = SkippedRow {
                    index,
                    cell_count: dom::child_elements(row).len(),
                    text: dom::text_of(row),
                };
                ::log::warn!(
                    "Skipped seller row {} ({} cells): {}",
                    skipped.index,
                    skipped.cell_count,
                    skipped.text
                );
                table.skipped.push(skipped);
            }
        }
    }

    ::log::debug!(
        "Extracted {} sellers, skipped {} rows",
        table.sellers.len(),
        table.skipped.len()
    );
    Ok(table)
}
