//! Live-frame analysis.
//!
//! A camera preview hands over one frame at a time. [`FrameAnalyzer`] cuts
//! the frame down to the region of interest, turns it upright, runs the
//! configured detector and produces both the result list and an [`Overlay`]
//! in view coordinates. Acquiring frames and painting the overlay belong to
//! the caller.

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::output::{BarcodeResult, CropRect};
use crate::overlay::Overlay;
use crate::pipeline::crop::clamp_to_image;
use crate::pipeline::detect::BoundingBox;
use crate::scan::{resolve_detector, scan_single};
use image::{DynamicImage, GenericImageView};
use std::borrow::Cow;
use tracing::trace;

/// One frame from a camera.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub image: DynamicImage,
    /// Region of interest in frame pixels; `None` analyses the whole frame.
    pub crop: Option<CropRect>,
    /// Clockwise rotation that makes the frame upright.
    pub rotation_degrees: u32,
}

impl CameraFrame {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            crop: None,
            rotation_degrees: 0,
        }
    }
}

/// What one frame produced.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub results: Vec<BarcodeResult>,
    /// Boxes scaled to the view; empty means clear the preview.
    pub overlay: Overlay,
}

/// Analyses camera frames with the detector and listener from a [`ScanConfig`].
#[derive(Debug, Clone, Default)]
pub struct FrameAnalyzer {
    config: ScanConfig,
}

impl FrameAnalyzer {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Analyse one frame synchronously.
    ///
    /// `view_size` is the preview's size in view units; boxes are mapped from
    /// the upright, cropped frame onto it. Without a view size the overlay
    /// stays in frame pixels.
    pub fn analyze(
        &self,
        frame: &CameraFrame,
        view_size: Option<(u32, u32)>,
    ) -> Result<FrameAnalysis, ScanError> {
        let region = region_of_interest(&frame.image, frame.crop);
        let detector = resolve_detector(&self.config);
        let scanned = scan_single(detector.as_ref(), &region, frame.rotation_degrees, None)?;

        let overlay = if scanned.detections.is_empty() {
            Overlay::empty()
        } else {
            let upright = (scanned.page.width, scanned.page.height);
            let (sx, sy) = view_size
                .map(|view| Overlay::scale_for(upright, view))
                .unwrap_or((1.0, 1.0));
            Overlay::from_detections(&scanned.detections, sx, sy)
        };
        trace!(
            "Frame: {} results, {} overlay boxes",
            scanned.results.len(),
            overlay.boxes.len()
        );

        if let Some(ref listener) = self.config.listener {
            listener.on_overlay(&overlay);
            if !scanned.results.is_empty() {
                listener.on_detected(&scanned.results);
            }
        }

        Ok(FrameAnalysis {
            results: scanned.results,
            overlay,
        })
    }
}

fn region_of_interest(image: &DynamicImage, crop: Option<CropRect>) -> Cow<'_, DynamicImage> {
    let Some(c) = crop else {
        return Cow::Borrowed(image);
    };
    let (w, h) = image.dimensions();
    let right = (c.x as i64 + c.width as i64).min(i32::MAX as i64) as i32;
    let bottom = (c.y as i64 + c.height as i64).min(i32::MAX as i64) as i32;
    let left = c.x.min(i32::MAX as u32) as i32;
    let top = c.y.min(i32::MAX as u32) as i32;
    let r = clamp_to_image(&BoundingBox::new(left, top, right, bottom), w, h);
    Cow::Owned(image.crop_imm(r.x, r.y, r.width, r.height))
}
