//! Image encoding for exported results.
//!
//! Cropped codes leave the library in two shapes: a base64 PNG for JSON
//! output, and a quality-100 JPEG file when saving results to disk.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// JPEG quality used for saved crops.
pub const JPEG_QUALITY: u8 = 100;

/// Encode an image as a base64 PNG string.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded crop → {} bytes base64", b64.len());
    Ok(b64)
}

/// Encode an image as JPEG bytes at [`JPEG_QUALITY`].
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(buf)
}
