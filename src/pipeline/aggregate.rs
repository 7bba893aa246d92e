//! Aggregation: merge per-page results into the single list a caller sees.

use crate::output::BarcodeResult;

/// Flatten per-page result lists, keeping page order and, within a page,
/// detector order. Identical values are kept; nothing is deduplicated.
pub fn flatten_pages(pages: Vec<Vec<BarcodeResult>>) -> Vec<BarcodeResult> {
    let total = pages.iter().map(Vec::len).sum();
    let mut results = Vec::with_capacity(total);
    for page in pages {
        results.extend(page);
    }
    results
}
