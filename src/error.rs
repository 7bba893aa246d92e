//! Error types for the barcode-scan library.
//!
//! Two distinct types reflect two distinct outcomes of a failed scan:
//!
//! * [`ScanError`]: **Fatal**: the scan cannot proceed (file missing, PDF
//!   corrupt, detector blew up). Returned as `Err(ScanError)` from the
//!   top-level `scan*` functions.
//!
//! * [`ScanNotice`]: **Recovered**: the input was understood well enough to
//!   refuse it politely (unsupported format, password-protected PDF). Returned
//!   as [`crate::output::ScanOutcome::Skipped`] and handed to
//!   [`crate::listener::ScanListener::on_notice`] so a UI can show it.
//!
//! A detection the detector returned without a bounding box or a value is
//! neither: it is skipped and counted in
//! [`crate::output::ScanStats::skipped_detections`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the barcode-scan library.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file was routed to the image path but could not be decoded.
    #[error("Could not decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF refused to open because it is password protected.
    ///
    /// Raised by [`crate::pipeline::render::PageRasterizer`] implementations;
    /// [`crate::scan::scan`] converts it into [`ScanNotice::ProtectedDocument`]
    /// so it never reaches callers of the top-level API.
    #[error("PDF '{path}' is password protected")]
    ProtectedDocument { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Detection errors ──────────────────────────────────────────────────
    /// The barcode detector failed on an image. `page` is 0 for single images.
    #[error("Detector '{detector}' failed on page {page}: {detail}")]
    DetectionFailed {
        page: usize,
        detector: String,
        detail: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a result file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Scanning PDFs needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A user-visible notice for an input the pipeline declined to scan.
///
/// Callers distinguish "nothing found" (an empty result list) from "never
/// scanned" by receiving one of these instead of a list.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum ScanNotice {
    /// MIME type (and extension) did not match any supported route.
    #[error("Unsupported file format")]
    UnsupportedFormat {
        mime: Option<String>,
        file_name: Option<String>,
    },

    /// The PDF could not be opened without a (correct) password.
    #[error("PDF file is password protected")]
    ProtectedDocument { file_name: Option<String> },
}
