//! Overlay data for live previews.
//!
//! An [`Overlay`] is a plain list of boxes with their decoded text, already
//! mapped into view coordinates. It holds no reference to detector types, so
//! any UI layer can paint it.

use crate::pipeline::detect::{BoundingBox, RawDetection};
use serde::{Deserialize, Serialize};

/// A rectangle in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl OverlayRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// One detected code as it should appear on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayBox {
    pub rect: OverlayRect,
    pub text: String,
}

/// Everything a preview needs to draw for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Overlay {
    pub boxes: Vec<OverlayBox>,
}

impl Overlay {
    /// An overlay with nothing to draw.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Build an overlay from raw detections, scaling frame pixels to view
    /// units. Detections missing a box or value are left out.
    pub fn from_detections(detections: &[RawDetection], scale_x: f32, scale_y: f32) -> Self {
        let boxes = detections
            .iter()
            .filter_map(|d| {
                let bbox = d.bounding_box?;
                let text = d.raw_value.as_deref().filter(|v| !v.is_empty())?;
                Some(OverlayBox {
                    rect: scale_box(&bbox, scale_x, scale_y),
                    text: text.to_string(),
                })
            })
            .collect();
        Self { boxes }
    }

    /// Per-axis factors mapping a `frame` of pixels onto a `view`.
    pub fn scale_for(frame: (u32, u32), view: (u32, u32)) -> (f32, f32) {
        let sx = if frame.0 == 0 { 1.0 } else { view.0 as f32 / frame.0 as f32 };
        let sy = if frame.1 == 0 { 1.0 } else { view.1 as f32 / frame.1 as f32 };
        (sx, sy)
    }
}

fn scale_box(bbox: &BoundingBox, sx: f32, sy: f32) -> OverlayRect {
    OverlayRect {
        left: bbox.left as f32 * sx,
        top: bbox.top as f32 * sy,
        right: bbox.right as f32 * sx,
        bottom: bbox.bottom as f32 * sy,
    }
}
