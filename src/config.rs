//! Configuration types for barcode scanning.
//!
//! All scan behaviour is controlled through [`ScanConfig`], built via its
//! [`ScanConfigBuilder`]. The external capabilities (detector, rasterizer,
//! listener) live in the config as trait objects so tests and embedders can
//! swap them without touching the pipeline.

use crate::error::ScanError;
use crate::listener::ScanListener;
use crate::pipeline::detect::BarcodeDetector;
use crate::pipeline::render::PageRasterizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Canonical MIME type for PDF documents.
pub const MIME_PDF: &str = "application/pdf";
/// Generic binary type some servers and pickers report for PDFs.
pub const MIME_BINARY_STREAM: &str = "binary/octet-stream";
pub const MIME_BMP: &str = "image/bmp";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";
pub const MIME_TIFF: &str = "image/tiff";

/// Configuration for a scan.
///
/// Built via [`ScanConfig::builder()`] or using [`ScanConfig::default()`].
///
/// # Example
/// ```rust
/// use barcode_scan::ScanConfig;
///
/// let config = ScanConfig::builder()
///     .scale_factor(3.0)
///     .password("hunter2")
///     .build()
///     .unwrap();
/// assert_eq!(config.scale_factor, 3.0);
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// Upscale factor applied to a PDF page's native size when rasterising.
    /// Range: 0.5–8.0. Default: 2.0.
    ///
    /// Barcodes printed small on a page need more than one pixel per point
    /// for the detector to resolve individual modules.
    pub scale_factor: f32,

    /// User password for protected PDFs.
    pub password: Option<String>,

    /// Declared MIME type. Overrides whatever input resolution discovers.
    pub mime_type: Option<String>,

    /// Display file name. Overrides the name taken from the path or URL.
    pub file_name: Option<String>,

    /// MIME tables used by the source classifier.
    pub mime_table: MimeTable,

    /// Rotation hint handed to the detector for image inputs. Default: 0.
    pub rotation_degrees: u32,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Explicit path to the pdfium shared library (file or directory).
    pub pdfium_library_path: Option<PathBuf>,

    /// Detector to use. Default: [`crate::pipeline::detect::RxingDetector`].
    pub detector: Option<Arc<dyn BarcodeDetector>>,

    /// PDF rasterizer to use. Default: [`crate::pipeline::render::PdfiumRasterizer`].
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Receives results, notices, per-page progress and overlays.
    pub listener: Option<Arc<dyn ScanListener>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scale_factor: 2.0,
            password: None,
            mime_type: None,
            file_name: None,
            mime_table: MimeTable::default(),
            rotation_degrees: 0,
            download_timeout_secs: 120,
            pdfium_library_path: None,
            detector: None,
            rasterizer: None,
            listener: None,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("scale_factor", &self.scale_factor)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .field("mime_table", &self.mime_table)
            .field("rotation_degrees", &self.rotation_degrees)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("detector", &self.detector.as_ref().map(|d| d.name()))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .field("listener", &self.listener.as_ref().map(|_| "<dyn ScanListener>"))
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ScanConfig`].
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl fmt::Debug for ScanConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ScanConfigBuilder {
    pub fn scale_factor(mut self, factor: f32) -> Self {
        self.config.scale_factor = factor.clamp(0.5, 8.0);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.config.mime_type = Some(mime.into());
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = Some(name.into());
        self
    }

    pub fn mime_table(mut self, table: MimeTable) -> Self {
        self.config.mime_table = table;
        self
    }

    pub fn rotation_degrees(mut self, degrees: u32) -> Self {
        self.config.rotation_degrees = degrees % 360;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn detector(mut self, detector: Arc<dyn BarcodeDetector>) -> Self {
        self.config.detector = Some(detector);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ScanListener>) -> Self {
        self.config.listener = Some(listener);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, ScanError> {
        let c = &self.config;
        if !c.scale_factor.is_finite() || c.scale_factor < 0.5 || c.scale_factor > 8.0 {
            return Err(ScanError::InvalidConfig(format!(
                "Scale factor must be 0.5–8.0, got {}",
                c.scale_factor
            )));
        }
        if c.rotation_degrees % 90 != 0 {
            return Err(ScanError::InvalidConfig(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                c.rotation_degrees
            )));
        }
        if c.mime_table.pdf.is_empty() {
            return Err(ScanError::InvalidConfig(
                "PDF MIME type must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── MIME tables ──────────────────────────────────────────────────────────

/// Immutable MIME data owned by the source classifier.
///
/// MIME comparisons are exact; the PDF extension is compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeTable {
    /// Canonical PDF type; always routes to the PDF path.
    pub pdf: String,
    /// Generic binary type; routes to the PDF path only with `pdf_extension`.
    pub binary_stream: String,
    /// File extension (without the dot) identifying a PDF under `binary_stream`.
    pub pdf_extension: String,
    /// Image types routed to the image path.
    pub image_types: BTreeSet<String>,
}

impl Default for MimeTable {
    fn default() -> Self {
        Self {
            pdf: MIME_PDF.to_string(),
            binary_stream: MIME_BINARY_STREAM.to_string(),
            pdf_extension: "pdf".to_string(),
            image_types: [MIME_BMP, MIME_JPEG, MIME_PNG, MIME_GIF, MIME_TIFF]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl MimeTable {
    pub fn is_image_type(&self, mime: &str) -> bool {
        self.image_types.contains(mime)
    }

    /// Every MIME type that can lead to a scan.
    pub fn accepted_types(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self.image_types.iter().map(String::as_str).collect();
        all.push(&self.pdf);
        all.push(&self.binary_stream);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ScanConfig::default();
        assert_eq!(c.scale_factor, 2.0);
        assert_eq!(c.rotation_degrees, 0);
        assert!(c.detector.is_none());
        assert!(c.rasterizer.is_none());
    }

    #[test]
    fn builder_clamps_scale() {
        let c = ScanConfig::builder().scale_factor(100.0).build().unwrap();
        assert_eq!(c.scale_factor, 8.0);
        let c = ScanConfig::builder().scale_factor(0.0).build().unwrap();
        assert_eq!(c.scale_factor, 0.5);
    }

    #[test]
    fn builder_rejects_odd_rotation() {
        let err = ScanConfig::builder().rotation_degrees(45).build().unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
        let c = ScanConfig::builder().rotation_degrees(450).build().unwrap();
        assert_eq!(c.rotation_degrees, 90);
    }

    #[test]
    fn debug_redacts_password() {
        let c = ScanConfig::builder().password("secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn default_mime_table_accepts_exactly_seven_types() {
        let table = MimeTable::default();
        let mut accepted = table.accepted_types();
        accepted.sort_unstable();
        assert_eq!(
            accepted,
            vec![
                "application/pdf",
                "binary/octet-stream",
                "image/bmp",
                "image/gif",
                "image/jpeg",
                "image/png",
                "image/tiff",
            ]
        );
    }
}
