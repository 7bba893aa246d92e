//! Source classification: decide from MIME type and file name which path a
//! file takes through the pipeline.
//!
//! The rule is literal. MIME types are compared exactly, and the
//! generic binary type only counts as a PDF when the extension is exactly
//! `pdf` (lowercase). Anything else is unsupported, which the caller turns
//! into a user notice rather than an error.

use crate::config::MimeTable;

/// Where a file goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Pdf,
    Image,
    Unsupported,
}

/// Classify a source by its declared MIME type and file name.
pub fn classify(table: &MimeTable, mime: Option<&str>, file_name: Option<&str>) -> Route {
    let Some(mime) = mime else {
        return Route::Unsupported;
    };

    if mime == table.pdf {
        return Route::Pdf;
    }

    if mime == table.binary_stream && file_extension(file_name) == Some(table.pdf_extension.as_str())
    {
        return Route::Pdf;
    }

    if table.is_image_type(mime) {
        return Route::Image;
    }

    Route::Unsupported
}

/// Text after the last `.` of a file name, or `None` when there is no dot or
/// nothing follows it.
pub fn file_extension(file_name: Option<&str>) -> Option<&str> {
    let name = file_name?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
