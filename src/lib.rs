//! # barcode-scan
//!
//! Find and decode every barcode in an image or a PDF, and return each one
//! with its decoded text and the cropped region of the page it came from.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file / URL
//!  │
//!  ├─ 1. Input     resolve local file or download; sniff MIME type
//!  ├─ 2. Classify  PDF, image, or decline with a notice
//!  ├─ 3. Render    rasterise PDF pages at 2× on white via pdfium (spawn_blocking)
//!  ├─ 4. Detect    run rxing (or any BarcodeDetector) on each page, in order
//!  ├─ 5. Crop      clamp each box to the page and cut out the code
//!  └─ 6. Deliver   one flat, page-ordered list of results
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use barcode_scan::{scan, ScanConfig, ScanOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::default();
//!     match scan("boarding-pass.pdf", &config).await? {
//!         ScanOutcome::Detected(output) => {
//!             for result in &output.results {
//!                 println!("page {:?}: {}", result.page, result.raw_value);
//!             }
//!         }
//!         ScanOutcome::Skipped(notice) => eprintln!("{notice}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `barcode-scan` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! barcode-scan = { version = "0.3", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! PDF input needs the pdfium shared library. It is looked up at
//! `ScanConfig::pdfium_library_path`, then `PDFIUM_LIB_PATH`, then the
//! current directory, then the system library path. Image input does not
//! need pdfium at all.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod frame;
pub mod listener;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod scan;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MimeTable, ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanNotice};
pub use frame::{CameraFrame, FrameAnalysis, FrameAnalyzer};
pub use listener::ScanListener;
pub use output::{BarcodeResult, CropRect, PageScan, ScanOutcome, ScanOutput, ScanStats, SourceKind};
pub use overlay::{Overlay, OverlayBox, OverlayRect};
pub use pipeline::detect::{BarcodeDetector, BoundingBox, DetectError, RawDetection, RxingDetector};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer, RenderedPage};
pub use scan::{scan, scan_bytes, scan_image, scan_sync, scan_to_dir};
