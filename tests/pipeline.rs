//! Integration tests for the scan pipeline.
//!
//! The detector and rasterizer are in-test fakes, so none of these need
//! libpdfium or real barcodes. Fixture images are generated with `image`.

use barcode_scan::{
    scan, scan_bytes, scan_to_dir, BarcodeDetector, BarcodeResult, BoundingBox, DetectError,
    PageRasterizer, RawDetection, RenderedPage, ScanConfig, ScanError, ScanListener, ScanNotice,
    ScanOutcome, SourceKind,
};
use barcode_scan::pipeline::render::PageCallback;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Returns a fixed list of detections per image width and counts calls.
#[derive(Default)]
struct FakeDetector {
    by_width: Vec<(u32, Vec<RawDetection>)>,
    calls: AtomicUsize,
}

impl FakeDetector {
    fn always(detections: Vec<RawDetection>) -> Self {
        Self {
            by_width: vec![(0, detections)],
            calls: AtomicUsize::new(0),
        }
    }
}

impl BarcodeDetector for FakeDetector {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn detect(&self, image: &DynamicImage, _rotation: u32) -> Result<Vec<RawDetection>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hit = self
            .by_width
            .iter()
            .find(|(w, _)| *w == 0 || *w == image.width())
            .map(|(_, d)| d.clone())
            .unwrap_or_default();
        Ok(hit)
    }
}

struct FailingDetector;

impl BarcodeDetector for FailingDetector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect(&self, _: &DynamicImage, _: u32) -> Result<Vec<RawDetection>, DetectError> {
        Err(DetectError("engine crashed".into()))
    }
}

/// Renders `widths.len()` blank pages, one per width.
struct FakePdf {
    widths: Vec<u32>,
    protected: bool,
    calls: AtomicUsize,
}

impl FakePdf {
    fn pages(widths: &[u32]) -> Self {
        Self {
            widths: widths.to_vec(),
            protected: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn protected() -> Self {
        Self {
            widths: vec![],
            protected: true,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PageRasterizer for FakePdf {
    fn rasterize(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        _scale_factor: f32,
        on_page: &mut PageCallback<'_>,
    ) -> Result<usize, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.protected && password != Some("open-sesame") {
            return Err(ScanError::ProtectedDocument {
                path: pdf_path.to_path_buf(),
            });
        }
        for (index, &w) in self.widths.iter().enumerate() {
            on_page(RenderedPage {
                index,
                page_count: self.widths.len(),
                image: DynamicImage::new_rgb8(w, 80),
            })?;
        }
        Ok(self.widths.len())
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ScanListener for Recorder {
    fn on_scan_start(&self, source: SourceKind, page_count: usize) {
        self.push(format!("start {source:?} {page_count}"));
    }

    fn on_page_scanned(&self, page_num: usize, total_pages: usize, result_count: usize) {
        self.push(format!("page {page_num}/{total_pages} {result_count}"));
    }

    fn on_detected(&self, results: &[BarcodeResult]) {
        self.push(format!("detected {}", results.len()));
    }

    fn on_notice(&self, notice: &ScanNotice) {
        self.push(format!("notice {notice}"));
    }
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn det(bbox: Option<(i32, i32, i32, i32)>, value: Option<&str>) -> RawDetection {
    RawDetection {
        bounding_box: bbox.map(|(l, t, r, b)| BoundingBox::new(l, t, r, b)),
        raw_value: value.map(String::from),
        format: Some("QR_CODE".into()),
    }
}

fn write_image(dir: &Path, name: &str, format: ImageFormat) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::new_rgb8(100, 100)
        .save_with_format(&path, format)
        .unwrap();
    path
}

fn write_pdf_stub(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.7\n%fake body for sniffing\n%%EOF\n").unwrap();
    path
}

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

// ── Image path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn jpeg_with_one_code_yields_one_cropped_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(dir.path(), "label.jpg", ImageFormat::Jpeg);

    let detector = Arc::new(FakeDetector::always(vec![det(
        Some((10, 10, 50, 50)),
        Some("HELLO"),
    )]));
    let recorder = Arc::new(Recorder::default());
    let config = ScanConfig::builder()
        .detector(detector.clone())
        .listener(recorder.clone())
        .build()
        .unwrap();

    let outcome = scan(path_str(&path), &config).await.unwrap();
    let results = outcome.results().expect("scan should run");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].raw_value, "HELLO");
    assert_eq!(results[0].page, None);
    let crop = results[0].image.as_ref().unwrap();
    assert_eq!((crop.width(), crop.height()), (40, 40));
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        recorder.events(),
        vec!["start Image 1", "page 1/1 1", "detected 1"]
    );
}

#[tokio::test]
async fn image_is_decoded_by_content_not_extension() {
    let dir = tempfile::tempdir().unwrap();
    // PNG bytes behind a misleading name; the sniffed type routes it.
    let path = write_image(dir.path(), "scan.dat", ImageFormat::Png);
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::always(vec![det(
            Some((0, 0, 10, 10)),
            Some("X"),
        )])))
        .build()
        .unwrap();

    let outcome = scan(path_str(&path), &config).await.unwrap();
    assert_eq!(outcome.results().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_bounds_box_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(dir.path(), "edge.png", ImageFormat::Png);
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::always(vec![
            det(Some((-20, 80, 30, 140)), Some("EDGE")),
            det(Some((200, 200, 300, 300)), Some("GONE")),
        ])))
        .build()
        .unwrap();

    let output = scan(path_str(&path), &config)
        .await
        .unwrap()
        .into_output()
        .unwrap();

    let edge = &output.results[0];
    assert_eq!(
        (edge.bounds.x, edge.bounds.y, edge.bounds.width, edge.bounds.height),
        (0, 80, 30, 20)
    );
    // Entirely outside: kept, but with no crop.
    let gone = &output.results[1];
    assert!(gone.bounds.is_empty());
    assert!(gone.image.is_none());
}

#[tokio::test]
async fn malformed_detections_are_skipped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(dir.path(), "mixed.png", ImageFormat::Png);
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::always(vec![
            det(None, Some("NO BOX")),
            det(Some((0, 0, 20, 20)), Some("OK")),
            det(Some((0, 0, 20, 20)), Some("")),
            det(Some((0, 0, 20, 20)), None),
        ])))
        .build()
        .unwrap();

    let output = scan(path_str(&path), &config)
        .await
        .unwrap()
        .into_output()
        .unwrap();
    assert_eq!(output.raw_values(), vec!["OK"]);
    assert_eq!(output.stats.skipped_detections, 3);
}

#[tokio::test]
async fn image_without_codes_is_an_empty_list_not_a_notice() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(dir.path(), "blank.bmp", ImageFormat::Bmp);
    let recorder = Arc::new(Recorder::default());
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::default()))
        .listener(recorder.clone())
        .build()
        .unwrap();

    let outcome = scan(path_str(&path), &config).await.unwrap();
    assert_eq!(outcome.results().map(<[_]>::len), Some(0));
    assert_eq!(recorder.events().last().unwrap(), "detected 0");
}

// ── Unsupported ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_file_is_unsupported_and_never_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not a barcode").unwrap();

    let detector = Arc::new(FakeDetector::default());
    let recorder = Arc::new(Recorder::default());
    let config = ScanConfig::builder()
        .mime_type("text/plain")
        .detector(detector.clone())
        .listener(recorder.clone())
        .build()
        .unwrap();

    let outcome = scan(path_str(&path), &config).await.unwrap();
    match outcome {
        ScanOutcome::Skipped(ScanNotice::UnsupportedFormat { mime, file_name }) => {
            assert_eq!(mime.as_deref(), Some("text/plain"));
            assert_eq!(file_name.as_deref(), Some("notes.txt"));
        }
        other => panic!("expected unsupported notice, got {other:?}"),
    }
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.events(), vec!["notice Unsupported file format"]);
}

#[tokio::test]
async fn binary_stream_needs_exact_lowercase_pdf_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("download");
    std::fs::write(&path, [0u8, 1, 2, 3]).unwrap();

    let rasterizer = Arc::new(FakePdf::pages(&[60]));
    let base = ScanConfig::builder()
        .mime_type("binary/octet-stream")
        .detector(Arc::new(FakeDetector::default()))
        .rasterizer(rasterizer.clone());

    let as_pdf = base.file_name("boarding.pdf").build().unwrap();
    let outcome = scan(path_str(&path), &as_pdf).await.unwrap();
    assert!(outcome.results().is_some());
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);

    let upper = ScanConfig {
        file_name: Some("boarding.PDF".into()),
        ..as_pdf
    };
    let outcome = scan(path_str(&path), &upper).await.unwrap();
    assert!(matches!(
        outcome.notice(),
        Some(ScanNotice::UnsupportedFormat { .. })
    ));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);
}

// ── PDF path ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_results_are_flattened_in_page_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf_stub(dir.path(), "tickets.pdf");

    let detector = Arc::new(FakeDetector {
        by_width: vec![
            (
                100,
                vec![
                    det(Some((0, 0, 10, 10)), Some("A")),
                    det(Some((20, 0, 30, 10)), Some("B")),
                ],
            ),
            (101, vec![]),
            (102, vec![det(Some((5, 5, 15, 15)), Some("C"))]),
        ],
        calls: AtomicUsize::new(0),
    });
    let recorder = Arc::new(Recorder::default());
    let config = ScanConfig::builder()
        .detector(detector.clone())
        .rasterizer(Arc::new(FakePdf::pages(&[100, 101, 102])))
        .listener(recorder.clone())
        .build()
        .unwrap();

    let output = scan(path_str(&path), &config)
        .await
        .unwrap()
        .into_output()
        .unwrap();

    assert_eq!(output.raw_values(), vec!["A", "B", "C"]);
    let pages: Vec<_> = output.results.iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![Some(1), Some(1), Some(3)]);
    assert_eq!(output.stats.page_count, 3);
    assert_eq!(output.stats.source, SourceKind::Pdf);
    assert_eq!(output.pages.len(), 3);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        recorder.events(),
        vec![
            "start Pdf 3",
            "page 1/3 2",
            "page 2/3 0",
            "page 3/3 1",
            "detected 3",
        ]
    );
}

#[tokio::test]
async fn empty_pdf_yields_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf_stub(dir.path(), "empty.pdf");
    let recorder = Arc::new(Recorder::default());
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::default()))
        .rasterizer(Arc::new(FakePdf::pages(&[])))
        .listener(recorder.clone())
        .build()
        .unwrap();

    let outcome = scan(path_str(&path), &config).await.unwrap();
    assert_eq!(outcome.results().map(<[_]>::len), Some(0));
    assert_eq!(recorder.events(), vec!["start Pdf 0", "detected 0"]);
}

#[tokio::test]
async fn protected_pdf_is_a_notice_without_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf_stub(dir.path(), "locked.pdf");
    let detector = Arc::new(FakeDetector::default());
    let recorder = Arc::new(Recorder::default());
    let config = ScanConfig::builder()
        .detector(detector.clone())
        .rasterizer(Arc::new(FakePdf::protected()))
        .listener(recorder.clone())
        .build()
        .unwrap();

    let outcome = scan(path_str(&path), &config).await.unwrap();
    assert_eq!(
        outcome.notice(),
        Some(&ScanNotice::ProtectedDocument {
            file_name: Some("locked.pdf".into())
        })
    );
    assert!(outcome.results().is_none());
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        recorder.events(),
        vec!["notice PDF file is password protected"]
    );
}

#[tokio::test]
async fn detector_failure_aborts_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf_stub(dir.path(), "doc.pdf");
    let config = ScanConfig::builder()
        .detector(Arc::new(FailingDetector))
        .rasterizer(Arc::new(FakePdf::pages(&[50, 50])))
        .build()
        .unwrap();

    let err = scan(path_str(&path), &config).await.unwrap_err();
    assert!(
        matches!(err, ScanError::DetectionFailed { page: 1, .. }),
        "got: {err}"
    );
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_is_fatal() {
    let err = scan("/no/such/dir/code.png", &ScanConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::FileNotFound { .. }));
}

#[tokio::test]
async fn truncated_image_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    // PNG signature only.
    std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::default()))
        .build()
        .unwrap();

    let err = scan(path_str(&path), &config).await.unwrap_err();
    assert!(matches!(err, ScanError::ImageDecodeFailed { .. }), "got: {err}");
}

// ── Other entry points ───────────────────────────────────────────────────────

#[tokio::test]
async fn scan_bytes_sniffs_png() {
    let mut png = Vec::new();
    DynamicImage::new_rgb8(30, 30)
        .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::always(vec![det(
            Some((0, 0, 30, 30)),
            Some("BYTES"),
        )])))
        .build()
        .unwrap();

    let outcome = scan_bytes(&png, None, Some("upload.png"), &config)
        .await
        .unwrap();
    assert_eq!(outcome.into_output().unwrap().raw_values(), vec!["BYTES"]);
}

#[tokio::test]
async fn scan_to_dir_writes_jpegs_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(dir.path(), "two.png", ImageFormat::Png);
    let out_dir = dir.path().join("out");
    let config = ScanConfig::builder()
        .detector(Arc::new(FakeDetector::always(vec![
            det(Some((0, 0, 20, 20)), Some("ONE")),
            det(Some((500, 500, 600, 600)), Some("OFFSCREEN")),
            det(Some((50, 50, 70, 60)), Some("TWO")),
        ])))
        .build()
        .unwrap();

    let (outcome, written) = scan_to_dir(path_str(&path), &out_dir, &config)
        .await
        .unwrap();
    assert_eq!(outcome.results().unwrap().len(), 3);

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    // Empty crops produce no file; numbering follows result order.
    assert_eq!(names, vec!["result-1.jpg", "result-3.jpg", "results.json"]);

    let jpeg = image::open(out_dir.join("result-3.jpg")).unwrap();
    assert_eq!((jpeg.width(), jpeg.height()), (20, 10));

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out_dir.join("results.json")).unwrap()).unwrap();
    assert_eq!(json["results"][1]["raw_value"], "OFFSCREEN");
    assert_eq!(json["stats"]["result_count"], 3);
    assert!(!out_dir.join("results.json.tmp").exists());
}

#[tokio::test]
async fn scan_to_dir_writes_nothing_for_skipped_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readme.md");
    std::fs::write(&path, "# hi").unwrap();
    let out_dir = dir.path().join("out");

    let (outcome, written) = scan_to_dir(path_str(&path), &out_dir, &ScanConfig::default())
        .await
        .unwrap();
    assert!(outcome.notice().is_some());
    assert!(written.is_empty());
    assert!(!out_dir.exists());
}
