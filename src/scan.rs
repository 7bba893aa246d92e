//! Scan entry points.
//!
//! [`scan`] is the one pipeline every caller goes through: it resolves the
//! input, classifies it, and runs the blocking stages (decode or rasterise,
//! detect, crop) on a single `spawn_blocking` worker, page after page.
//! Results are delivered once, as a complete list, after the last page.
//! There is no cancellation; a scan runs to completion or failure.

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanNotice};
use crate::output::{BarcodeResult, PageScan, ScanOutcome, ScanOutput, ScanStats, SourceKind};
use crate::pipeline::classify::{classify, Route};
use crate::pipeline::detect::{rotate_upright, BarcodeDetector, RawDetection, RxingDetector};
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::pipeline::{aggregate, crop, encode, input};
use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Scan a file or URL for barcodes.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` : local file path or HTTP/HTTPS URL
/// * `config`: scan configuration
///
/// # Returns
/// * `Ok(ScanOutcome::Detected(_))`: the scan ran; the list may be empty
/// * `Ok(ScanOutcome::Skipped(_))` : unsupported format or protected PDF;
///   the detector was never called on anything
///
/// # Errors
/// Returns `Err(ScanError)` only for fatal errors: missing or unreadable
/// file, undecodable image, corrupt PDF, detector failure.
pub async fn scan(
    input_str: impl AsRef<str>,
    config: &ScanConfig,
) -> Result<ScanOutcome, ScanError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting scan: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;

    // ── Step 2: Classify ─────────────────────────────────────────────────
    let mime = config.mime_type.clone().or(resolved.mime_type.clone());
    let file_name = config.file_name.clone().or(resolved.file_name.clone());
    let route = classify(&config.mime_table, mime.as_deref(), file_name.as_deref());
    debug!(
        "Classified {:?} (mime={:?}) as {:?}",
        file_name, mime, route
    );

    // ── Step 3: Run the blocking stages ──────────────────────────────────
    let path = resolved.path().to_path_buf();
    let worker_config = config.clone();
    let result = match route {
        Route::Unsupported => {
            warn!("Unsupported file format: mime={:?} name={:?}", mime, file_name);
            return Ok(skip(config, ScanNotice::UnsupportedFormat { mime, file_name }));
        }
        Route::Image => run_blocking(move || scan_image_file(&path, &worker_config)).await,
        Route::Pdf => run_blocking(move || scan_pdf_file(&path, &worker_config)).await,
    };

    // ── Step 4: Deliver ──────────────────────────────────────────────────
    match result {
        Ok(mut output) => {
            output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
            info!(
                "Scan complete: {} results from {} pages, {}ms total",
                output.stats.result_count, output.stats.page_count, output.stats.total_duration_ms
            );
            if let Some(ref listener) = config.listener {
                listener.on_detected(&output.results);
            }
            Ok(ScanOutcome::Detected(output))
        }
        Err(ScanError::ProtectedDocument { path }) => {
            warn!("PDF is password protected: {}", path.display());
            Ok(skip(config, ScanNotice::ProtectedDocument { file_name }))
        }
        Err(e) => Err(e),
    }
}

/// Synchronous wrapper around [`scan`].
///
/// Creates a temporary tokio runtime internally.
pub fn scan_sync(
    input_str: impl AsRef<str>,
    config: &ScanConfig,
) -> Result<ScanOutcome, ScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(scan(input_str, config))
}

/// Scan bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is deleted when this
/// returns. `mime` and `file_name` play the role of the declared type and
/// name a file picker would report; when `mime` is `None` the type is sniffed
/// from the bytes.
pub async fn scan_bytes(
    bytes: &[u8],
    mime: Option<&str>,
    file_name: Option<&str>,
    config: &ScanConfig,
) -> Result<ScanOutcome, ScanError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ScanError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ScanError::Internal(format!("tempfile write: {e}")))?;

    let mut config = config.clone();
    if let Some(m) = mime {
        config.mime_type = Some(m.to_string());
    }
    if let Some(n) = file_name {
        config.file_name = Some(n.to_string());
    }

    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `scan` returns
    scan(&path, &config).await
}

/// Scan a single in-memory image: detect, then crop.
///
/// Uses `config.rotation_degrees` as the detector's rotation hint; crops are
/// cut from the upright image.
pub fn scan_image(
    image: &DynamicImage,
    config: &ScanConfig,
) -> Result<Vec<BarcodeResult>, ScanError> {
    let detector = resolve_detector(config);
    let scanned = scan_single(detector.as_ref(), image, config.rotation_degrees, None)?;
    Ok(scanned.results)
}

/// Scan, then save every non-empty crop as `result-<n>.jpg` (quality 100) and
/// the full output as `results.json` in `dir`.
///
/// Files are written atomically (temp file + rename). Nothing is written when
/// the scan is skipped. Returns the outcome and the paths written.
pub async fn scan_to_dir(
    input_str: impl AsRef<str>,
    dir: impl AsRef<Path>,
    config: &ScanConfig,
) -> Result<(ScanOutcome, Vec<PathBuf>), ScanError> {
    let outcome = scan(input_str, config).await?;
    let dir = dir.as_ref();

    let ScanOutcome::Detected(ref output) = outcome else {
        return Ok((outcome, Vec::new()));
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ScanError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::new();
    for (i, result) in output.results.iter().enumerate() {
        let Some(ref crop) = result.image else {
            continue;
        };
        let path = dir.join(format!("result-{}.jpg", i + 1));
        let bytes = encode::encode_jpeg(crop)
            .map_err(|e| ScanError::Internal(format!("JPEG encoding failed: {e}")))?;
        write_atomic(&path, &bytes).await?;
        written.push(path);
    }

    let json_path = dir.join("results.json");
    let json = serde_json::to_vec_pretty(output)
        .map_err(|e| ScanError::Internal(format!("Failed to serialise results: {e}")))?;
    write_atomic(&json_path, &json).await?;
    written.push(json_path);

    Ok((outcome, written))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Detections and results for one image.
pub(crate) struct SingleScan {
    pub detections: Vec<RawDetection>,
    pub results: Vec<BarcodeResult>,
    pub page: PageScan,
}

/// Turn one image upright, run the detector on it and crop every detection.
///
/// `page` is the 1-indexed PDF page, or `None` for a standalone image. A
/// standalone image is page 1 in logs, errors and [`PageScan`]; only
/// `BarcodeResult::page` keeps the `None`.
pub(crate) fn scan_single(
    detector: &dyn BarcodeDetector,
    image: &DynamicImage,
    rotation_degrees: u32,
    page: Option<usize>,
) -> Result<SingleScan, ScanError> {
    let page_num = page.unwrap_or(1);
    // Rotated once; the detector and the cropper share the upright copy.
    let upright = rotate_upright(image, rotation_degrees);

    let start = Instant::now();
    let detections = detector
        .detect(&upright, 0)
        .map_err(|e| ScanError::DetectionFailed {
            page: page_num,
            detector: detector.name().to_string(),
            detail: e.to_string(),
        })?;
    let detect_duration_ms = start.elapsed().as_millis() as u64;

    let (results, skipped) = crop::crop_all(&upright, &detections, page);
    debug!(
        "Page {}: {} detections, {} results, {} skipped, {}ms",
        page_num,
        detections.len(),
        results.len(),
        skipped,
        detect_duration_ms
    );

    let page_scan = PageScan {
        page_num,
        width: upright.width(),
        height: upright.height(),
        result_count: results.len(),
        skipped_detections: skipped,
        detect_duration_ms,
    };

    Ok(SingleScan {
        detections,
        results,
        page: page_scan,
    })
}

/// Blocking image path: decode, detect, crop.
fn scan_image_file(path: &Path, config: &ScanConfig) -> Result<ScanOutput, ScanError> {
    let render_start = Instant::now();
    let image = decode_image(path)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    if let Some(ref listener) = config.listener {
        listener.on_scan_start(SourceKind::Image, 1);
    }

    let detector = resolve_detector(config);
    let scanned = scan_single(detector.as_ref(), &image, config.rotation_degrees, None)?;

    if let Some(ref listener) = config.listener {
        listener.on_page_scanned(1, 1, scanned.results.len());
    }

    Ok(build_output(
        SourceKind::Image,
        1,
        vec![scanned.results],
        vec![scanned.page],
        render_duration_ms,
    ))
}

/// Blocking PDF path: rasterise pages in order, detect and crop each.
fn scan_pdf_file(path: &Path, config: &ScanConfig) -> Result<ScanOutput, ScanError> {
    let rasterizer = resolve_rasterizer(config);
    let detector = resolve_detector(config);
    let listener = config.listener.as_deref();

    let mut per_page: Vec<Vec<BarcodeResult>> = Vec::new();
    let mut pages: Vec<PageScan> = Vec::new();
    let mut render_duration_ms = 0u64;
    let mut mark = Instant::now();

    let page_count = rasterizer.rasterize(
        path,
        config.password.as_deref(),
        config.scale_factor,
        &mut |page| {
            render_duration_ms += mark.elapsed().as_millis() as u64;
            let page_num = page.index + 1;
            if page.index == 0 {
                if let Some(l) = listener {
                    l.on_scan_start(SourceKind::Pdf, page.page_count);
                }
            }

            let scanned = scan_single(detector.as_ref(), &page.image, 0, Some(page_num))?;
            if let Some(l) = listener {
                l.on_page_scanned(page_num, page.page_count, scanned.results.len());
            }
            per_page.push(scanned.results);
            pages.push(scanned.page);

            mark = Instant::now();
            Ok(())
        },
    )?;

    if page_count == 0 {
        if let Some(l) = listener {
            l.on_scan_start(SourceKind::Pdf, 0);
        }
    }

    Ok(build_output(
        SourceKind::Pdf,
        page_count,
        per_page,
        pages,
        render_duration_ms,
    ))
}

fn build_output(
    source: SourceKind,
    page_count: usize,
    per_page: Vec<Vec<BarcodeResult>>,
    pages: Vec<PageScan>,
    render_duration_ms: u64,
) -> ScanOutput {
    let results = aggregate::flatten_pages(per_page);
    let stats = ScanStats {
        source,
        page_count,
        result_count: results.len(),
        skipped_detections: pages.iter().map(|p| p.skipped_detections).sum(),
        render_duration_ms,
        detect_duration_ms: pages.iter().map(|p| p.detect_duration_ms).sum(),
        total_duration_ms: 0,
    };
    ScanOutput {
        results,
        pages,
        stats,
    }
}

/// Decode an image by content, not by extension.
fn decode_image(path: &Path) -> Result<DynamicImage, ScanError> {
    let decode_err = |detail: String| ScanError::ImageDecodeFailed {
        path: path.to_path_buf(),
        detail,
    };
    image::ImageReader::open(path)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))
}

async fn run_blocking<F>(f: F) -> Result<ScanOutput, ScanError>
where
    F: FnOnce() -> Result<ScanOutput, ScanError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ScanError::Internal(format!("Scan task panicked: {}", e)))?
}

fn skip(config: &ScanConfig, notice: ScanNotice) -> ScanOutcome {
    if let Some(ref listener) = config.listener {
        listener.on_notice(&notice);
    }
    ScanOutcome::Skipped(notice)
}

pub(crate) fn resolve_detector(config: &ScanConfig) -> Arc<dyn BarcodeDetector> {
    match config.detector {
        Some(ref detector) => Arc::clone(detector),
        None => Arc::new(RxingDetector::new()),
    }
}

fn resolve_rasterizer(config: &ScanConfig) -> Arc<dyn PageRasterizer> {
    match (&config.rasterizer, &config.pdfium_library_path) {
        (Some(rasterizer), _) => Arc::clone(rasterizer),
        (None, Some(path)) => Arc::new(PdfiumRasterizer::with_library_path(path.clone())),
        (None, None) => Arc::new(PdfiumRasterizer::new()),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ScanError> {
    let write_err = |e| ScanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}
