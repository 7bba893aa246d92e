//! Output types produced by a scan.

use crate::error::ScanNotice;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A pixel rectangle inside a source image, already clamped to its bounds.
///
/// `x + width` never exceeds the source width and `y + height` never exceeds
/// the source height. A zero-area rectangle is legal: it is what a detection
/// lying entirely outside the image clamps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One decoded barcode.
///
/// `raw_value` is never empty. `image` holds the cropped region of the source
/// image the code was found in; it is `None` when the clamped crop has zero
/// area and is not serialised (use [`crate::pipeline::encode`] to export it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarcodeResult {
    /// Decoded text of the code.
    pub raw_value: String,

    /// Cropped sub-image, if the clamped region is non-empty.
    #[serde(skip)]
    pub image: Option<DynamicImage>,

    /// Clamped crop rectangle in source-image pixels.
    pub bounds: CropRect,

    /// 1-indexed page for PDF sources, `None` for single images and frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,

    /// Symbology reported by the detector (e.g. `QR_CODE`, `EAN_13`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Which route the source classifier chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Image,
    Pdf,
}

/// Per-page bookkeeping for a PDF scan (single images produce one entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageScan {
    /// 1-indexed page number (1 for single images).
    pub page_num: usize,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
    /// Results emitted for this page.
    pub result_count: usize,
    /// Detections dropped for missing a bounding box or value.
    pub skipped_detections: usize,
    /// Wall-clock time of the detector call.
    pub detect_duration_ms: u64,
}

/// Aggregate statistics for one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStats {
    pub source: SourceKind,
    pub page_count: usize,
    pub result_count: usize,
    pub skipped_detections: usize,
    pub render_duration_ms: u64,
    pub detect_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The completed result of a scan that actually ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutput {
    /// Results in page order, then detector order within a page.
    pub results: Vec<BarcodeResult>,
    pub pages: Vec<PageScan>,
    pub stats: ScanStats,
}

impl ScanOutput {
    /// Decoded values in result order.
    pub fn raw_values(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.raw_value.as_str()).collect()
    }
}

/// What a call to [`crate::scan::scan`] produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanOutcome {
    /// The scan ran to completion; the result list may be empty.
    Detected(ScanOutput),
    /// The scan was never attempted.
    Skipped(ScanNotice),
}

impl ScanOutcome {
    /// The result list, or `None` if the scan was skipped.
    pub fn results(&self) -> Option<&[BarcodeResult]> {
        match self {
            ScanOutcome::Detected(out) => Some(&out.results),
            ScanOutcome::Skipped(_) => None,
        }
    }

    pub fn notice(&self) -> Option<&ScanNotice> {
        match self {
            ScanOutcome::Detected(_) => None,
            ScanOutcome::Skipped(n) => Some(n),
        }
    }

    pub fn into_output(self) -> Option<ScanOutput> {
        match self {
            ScanOutcome::Detected(out) => Some(out),
            ScanOutcome::Skipped(_) => None,
        }
    }
}
