//! Result cropping: turn a raw detection into a [`BarcodeResult`].
//!
//! Detectors happily report boxes that hang off the edge of the image (a code
//! half out of frame, a quiet zone estimate that overshoots). The crop is the
//! intersection of that box with the image, so its sides stay within
//! `[0, width] × [0, height]` and a box entirely outside the image becomes a
//! zero-area crop instead of a panic.

use crate::output::{BarcodeResult, CropRect};
use crate::pipeline::detect::{BoundingBox, RawDetection};
use image::{DynamicImage, GenericImageView};
use tracing::warn;

/// Why a detection was dropped instead of becoming a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    MissingBoundingBox,
    MissingValue,
}

/// Intersect `bbox` with a `width × height` image.
pub fn clamp_to_image(bbox: &BoundingBox, width: u32, height: u32) -> CropRect {
    let (w, h) = (width as i64, height as i64);
    let left = (bbox.left as i64).clamp(0, w);
    let top = (bbox.top as i64).clamp(0, h);
    let right = (bbox.right as i64).clamp(0, w);
    let bottom = (bbox.bottom as i64).clamp(0, h);

    CropRect {
        x: left as u32,
        y: top as u32,
        width: (right - left).max(0) as u32,
        height: (bottom - top).max(0) as u32,
    }
}

/// Build a result from one detection on `image`.
///
/// Fails with [`Malformed`] when the detection has no box, no value or an
/// empty value; the caller logs and skips it.
pub fn crop_detection(
    image: &DynamicImage,
    detection: &RawDetection,
    page: Option<usize>,
) -> Result<BarcodeResult, Malformed> {
    let bbox = detection
        .bounding_box
        .as_ref()
        .ok_or(Malformed::MissingBoundingBox)?;
    let raw_value = detection
        .raw_value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(Malformed::MissingValue)?;

    let (width, height) = image.dimensions();
    let bounds = clamp_to_image(bbox, width, height);
    let crop = if bounds.is_empty() {
        None
    } else {
        Some(image.crop_imm(bounds.x, bounds.y, bounds.width, bounds.height))
    };

    Ok(BarcodeResult {
        raw_value: raw_value.to_string(),
        image: crop,
        bounds,
        page,
        format: detection.format.clone(),
    })
}

/// Crop every detection on one image, in detector order.
///
/// Returns the results plus the number of malformed detections skipped.
pub fn crop_all(
    image: &DynamicImage,
    detections: &[RawDetection],
    page: Option<usize>,
) -> (Vec<BarcodeResult>, usize) {
    let mut results = Vec::with_capacity(detections.len());
    let mut skipped = 0;

    for (i, detection) in detections.iter().enumerate() {
        match crop_detection(image, detection, page) {
            Ok(result) => results.push(result),
            Err(reason) => {
                skipped += 1;
                warn!(
                    "Skipping detection {} on page {}: {:?}",
                    i,
                    page.unwrap_or(1),
                    reason
                );
            }
        }
    }

    (results, skipped)
}
