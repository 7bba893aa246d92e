//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Pages are rendered one at a time at `scale_factor ×` their native size on
//! a white background and handed to a callback before the next page is
//! touched, so only one page bitmap is alive at once. The document and each
//! page are owned by the render function; they are closed when it returns,
//! whether it returns early with an error or not.
//!
//! The pdfium C++ library is not async-safe. Callers run the rasteriser
//! inside `tokio::task::spawn_blocking` (see [`crate::scan`]).

use crate::error::ScanError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rendered page.
#[derive(Debug)]
pub struct RenderedPage {
    /// 0-based page index.
    pub index: usize,
    /// Total pages in the document.
    pub page_count: usize,
    pub image: DynamicImage,
}

/// Callback receiving pages in order. Returning `Err` stops rendering.
pub type PageCallback<'a> = dyn FnMut(RenderedPage) -> Result<(), ScanError> + 'a;

/// A PDF rendering backend.
pub trait PageRasterizer: Send + Sync {
    /// Render every page of `pdf_path` in order, calling `on_page` for each.
    ///
    /// Returns the document's page count.
    ///
    /// # Errors
    /// * [`ScanError::ProtectedDocument`] when the document needs a password
    ///   that was not supplied or is wrong
    /// * [`ScanError::CorruptPdf`] for any other open failure
    /// * [`ScanError::RasterisationFailed`] when a page fails to render
    /// * whatever `on_page` returns
    fn rasterize(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        scale_factor: f32,
        on_page: &mut PageCallback<'_>,
    ) -> Result<usize, ScanError>;

    /// Render every page into memory, in order.
    fn render_all(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        scale_factor: f32,
    ) -> Result<Vec<DynamicImage>, ScanError> {
        let mut images = Vec::new();
        self.rasterize(pdf_path, password, scale_factor, &mut |page| {
            images.push(page.image);
            Ok(())
        })?;
        Ok(images)
    }
}

/// [`PageRasterizer`] backed by the pdfium shared library.
///
/// Library lookup order: the explicit path given to
/// [`PdfiumRasterizer::with_library_path`], then `PDFIUM_LIB_PATH`, then the
/// current directory, then the system library search path. A directory is
/// expanded to the platform library name inside it.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, ScanError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib)
            }
            None => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ScanError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        scale_factor: f32,
        on_page: &mut PageCallback<'_>,
    ) -> Result<usize, ScanError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| open_error(pdf_path, e))?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale_factor)
            .set_clear_color(PdfColor::WHITE)
            .render_form_data(true);

        for (index, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ScanError::RasterisationFailed {
                    page: index + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );

            on_page(RenderedPage {
                index,
                page_count,
                image,
            })?;
        }

        Ok(page_count)
    }
}

/// Map a pdfium open failure to the pipeline's error taxonomy.
///
/// pdfium reports a missing and a wrong password the same way
/// (`FPDF_ERR_PASSWORD`).
fn open_error(pdf_path: &Path, err: PdfiumError) -> ScanError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            ScanError::ProtectedDocument {
                path: pdf_path.to_path_buf(),
            }
        }
        other => ScanError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", other),
        },
    }
}
