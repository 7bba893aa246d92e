//! Listener trait for scan events.
//!
//! Inject an [`Arc<dyn ScanListener>`] via
//! [`crate::config::ScanConfigBuilder::listener`] to receive the final result
//! list, user notices, per-page progress and live-camera overlays.
//!
//! # Delivery guarantees
//!
//! * `on_detected` fires at most once per scan, after every page has been
//!   processed. There is no incremental delivery of results.
//! * `on_notice` fires instead of `on_detected` when the scan is skipped.
//! * Page events fire from the blocking worker thread, in page order.
//!
//! # Example
//!
//! ```rust
//! use barcode_scan::{BarcodeResult, ScanConfig, ScanListener};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Collect {
//!     values: Mutex<Vec<String>>,
//! }
//!
//! impl ScanListener for Collect {
//!     fn on_detected(&self, results: &[BarcodeResult]) {
//!         let mut values = self.values.lock().unwrap();
//!         values.extend(results.iter().map(|r| r.raw_value.clone()));
//!     }
//! }
//!
//! let config = ScanConfig::builder()
//!     .listener(Arc::new(Collect::default()) as Arc<dyn ScanListener>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ScanNotice;
use crate::output::{BarcodeResult, SourceKind};
use crate::overlay::Overlay;

/// Called by the scan pipeline and the frame analyzer.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: page events
/// are raised from a `spawn_blocking` thread.
pub trait ScanListener: Send + Sync {
    /// Called once the source has been classified and, for PDFs, opened.
    ///
    /// # Arguments
    /// * `source`    : route chosen by the classifier
    /// * `page_count`: pages that will be scanned (1 for images)
    fn on_scan_start(&self, source: SourceKind, page_count: usize) {
        let _ = (source, page_count);
    }

    /// Called after the detector has run on a page.
    ///
    /// # Arguments
    /// * `page_num`    : 1-indexed page number
    /// * `total_pages` : total pages being scanned
    /// * `result_count`: results kept for this page
    fn on_page_scanned(&self, page_num: usize, total_pages: usize, result_count: usize) {
        let _ = (page_num, total_pages, result_count);
    }

    /// Called once with the complete, ordered result list (possibly empty).
    fn on_detected(&self, results: &[BarcodeResult]) {
        let _ = results;
    }

    /// Called when the input was declined (unsupported, password protected).
    fn on_notice(&self, notice: &ScanNotice) {
        let _ = notice;
    }

    /// Called by [`crate::frame::FrameAnalyzer`] for every analysed frame.
    /// An empty overlay means "clear whatever is on screen".
    fn on_overlay(&self, overlay: &Overlay) {
        let _ = overlay;
    }
}
