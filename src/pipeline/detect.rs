//! Barcode detection: the seam between the pipeline and a decoding engine.
//!
//! The pipeline treats decoding as an opaque capability,
//! `detect(image, rotation) → [RawDetection]`, behind the [`BarcodeDetector`]
//! trait. [`RxingDetector`] is the bundled implementation; tests and embedders
//! plug in their own through [`crate::config::ScanConfigBuilder::detector`].
//!
//! Calls are synchronous and may block for as long as the engine needs. The
//! pipeline never retries and never calls one detector from two threads at
//! once within a scan; a detector shared between concurrent scans must do its
//! own serialisation.

use image::{DynamicImage, GrayImage};
use rxing::{Exceptions, RXingResult, ResultPoint};
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, trace};

/// Axis-aligned box in source-image pixel coordinates.
///
/// May extend past the image on any side; the cropper clamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i64 {
        self.right as i64 - self.left as i64
    }

    pub fn height(&self) -> i64 {
        self.bottom as i64 - self.top as i64
    }
}

/// What a detector reports for one code. Either field may be missing when
/// the engine located something it could not fully decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDetection {
    pub bounding_box: Option<BoundingBox>,
    pub raw_value: Option<String>,
    pub format: Option<String>,
}

/// Failure inside a detection engine.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DetectError(pub String);

/// A barcode decoding engine.
pub trait BarcodeDetector: Send + Sync {
    /// Short engine name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Find every code in `image`.
    ///
    /// `rotation_degrees` (0, 90, 180 or 270) is the clockwise rotation that
    /// makes the image upright. Returned boxes are in upright coordinates.
    fn detect(
        &self,
        image: &DynamicImage,
        rotation_degrees: u32,
    ) -> Result<Vec<RawDetection>, DetectError>;
}

/// Multi-format detector backed by `rxing` (QR, Data Matrix, Aztec, PDF417,
/// EAN/UPC, Code 128/39/93, ITF, Codabar).
#[derive(Debug, Clone, Copy, Default)]
pub struct RxingDetector;

impl RxingDetector {
    pub fn new() -> Self {
        Self
    }
}

impl BarcodeDetector for RxingDetector {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn detect(
        &self,
        image: &DynamicImage,
        rotation_degrees: u32,
    ) -> Result<Vec<RawDetection>, DetectError> {
        let upright = rotate_upright(image, rotation_degrees);
        let gray = upright.to_luma8();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        match rxing::helpers::detect_multiple_in_luma(gray.as_raw().clone(), width, height) {
            Ok(results) => {
                debug!("rxing: {} codes in {}x{} image", results.len(), width, height);
                Ok(results.iter().map(|r| to_raw_detection(r, &gray)).collect())
            }
            // rxing reports "nothing here" as an error.
            Err(Exceptions::NotFoundException(_)) => {
                trace!("rxing: no codes in {}x{} image", width, height);
                Ok(Vec::new())
            }
            Err(e) => Err(DetectError(e.to_string())),
        }
    }
}

fn to_raw_detection(result: &RXingResult, gray: &GrayImage) -> RawDetection {
    let points: Vec<(f32, f32)> = result
        .getRXingResultPoints()
        .iter()
        .map(|p| (p.getX(), p.getY()))
        .collect();

    let text = result.getText();
    RawDetection {
        bounding_box: bounding_box_of(&points).map(|b| extend_linear(gray, b)),
        raw_value: (!text.is_empty()).then(|| text.to_string()),
        format: Some(format!("{:?}", result.getBarcodeFormat())),
    }
}

/// Smallest integer box containing every point, or `None` without points.
pub fn bounding_box_of(points: &[(f32, f32)]) -> Option<BoundingBox> {
    let (first, rest) = points.split_first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for &(x, y) in rest {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    Some(BoundingBox::new(
        min_x.floor() as i32,
        min_y.floor() as i32,
        max_x.ceil() as i32,
        max_y.ceil() as i32,
    ))
}

/// Give a linear code's box its bar height.
///
/// 1D readers report the two ends of the scan line that decoded, so the box
/// has no height (or no width, for a code read top to bottom). Grow it along
/// the bars while neighbouring rows repeat the scan line's pattern; without
/// enough contrast to follow, pad by a quarter of the length on each side.
/// Boxes with area pass through unchanged.
pub fn extend_linear(gray: &GrayImage, bbox: BoundingBox) -> BoundingBox {
    let (w, h) = (bbox.width(), bbox.height());
    if h <= 1 && w > 1 {
        if let Some((top, bottom)) = bar_rows(gray, &bbox).filter(|(t, b)| b - t > 1) {
            return BoundingBox::new(bbox.left, top, bbox.right, bottom);
        }
        let pad = (w / 4).max(1);
        return BoundingBox::new(
            bbox.left,
            saturate(bbox.top as i64 - pad),
            bbox.right,
            saturate(bbox.bottom as i64 + pad),
        );
    }
    if w <= 1 && h > 1 {
        let pad = (h / 4).max(1);
        return BoundingBox::new(
            saturate(bbox.left as i64 - pad),
            bbox.top,
            saturate(bbox.right as i64 + pad),
            bbox.bottom,
        );
    }
    bbox
}

/// Rows above and below `bbox.top` whose dark/light pattern over
/// `left..right` matches the scan line to within 10%. Half-open range.
fn bar_rows(gray: &GrayImage, bbox: &BoundingBox) -> Option<(i32, i32)> {
    let (gw, gh) = gray.dimensions();
    if bbox.top < 0 || bbox.top as i64 >= gh as i64 {
        return None;
    }
    let row = bbox.top as u32;
    let x0 = bbox.left.clamp(0, gw as i32) as u32;
    let x1 = bbox.right.clamp(0, gw as i32) as u32;
    if x1 <= x0 {
        return None;
    }

    let line: Vec<u8> = (x0..x1).map(|x| gray.get_pixel(x, row).0[0]).collect();
    let lo = line.iter().copied().min()?;
    let hi = line.iter().copied().max()?;
    if hi - lo < 64 {
        return None;
    }
    let threshold = (lo as u16 + hi as u16) / 2;
    let pattern: Vec<bool> = line.iter().map(|&v| (v as u16) < threshold).collect();
    let tolerance = pattern.len() / 10;

    let matches = |y: u32| {
        (x0..x1)
            .zip(&pattern)
            .filter(|&(x, &dark)| ((gray.get_pixel(x, y).0[0] as u16) < threshold) != dark)
            .count()
            <= tolerance
    };

    let mut top = row;
    while top > 0 && matches(top - 1) {
        top -= 1;
    }
    let mut bottom = row + 1;
    while bottom < gh && matches(bottom) {
        bottom += 1;
    }
    Some((top as i32, bottom as i32))
}

fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Rotate `image` clockwise by `degrees` (multiples of 90; others pass through).
pub fn rotate_upright(image: &DynamicImage, degrees: u32) -> Cow<'_, DynamicImage> {
    match degrees % 360 {
        90 => Cow::Owned(image.rotate90()),
        180 => Cow::Owned(image.rotate180()),
        270 => Cow::Owned(image.rotate270()),
        _ => Cow::Borrowed(image),
    }
}
