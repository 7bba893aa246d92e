//! Pipeline stages for scanning a file for barcodes.
//!
//! Each submodule implements exactly one step, so each is testable on its own
//! and the engines behind [`detect`] and [`render`] can be swapped.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ classify ──┬─▶ render ──▶ [detect ──▶ crop] per page ──▶ aggregate
//! (path/URL)  (MIME)   │  (pdfium)     (rxing)    (clamp)             (flatten)
//!                      ├─▶ detect ──▶ crop                 (single image)
//!                      └─▶ notice                          (unsupported)
//! ```
//!
//! 1. [`input`]    : canonicalise the path or URL; discover MIME type and name
//! 2. [`classify`] : route to the PDF path, the image path, or a notice
//! 3. [`render`]   : rasterise PDF pages in order at a fixed upscale
//! 4. [`detect`]   : run the barcode engine on one image
//! 5. [`crop`]     : clamp each box to the image and cut out the code
//! 6. [`aggregate`]: flatten per-page lists in page order
//! 7. [`encode`]   : export crops as base64 PNG or JPEG

pub mod aggregate;
pub mod classify;
pub mod crop;
pub mod detect;
pub mod encode;
pub mod input;
pub mod render;
