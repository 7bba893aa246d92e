//! Input resolution: normalise a user-supplied path or URL to a local file
//! plus the MIME type and file name the classifier needs.
//!
//! A local file's MIME type is sniffed from its magic bytes with `infer`.
//! A downloaded file's MIME type is whatever the server declared in
//! `Content-Type`; servers that serve PDFs as `binary/octet-stream` are the
//! reason the classifier looks at the file name at all. Downloads land in a
//! `TempDir` that lives as long as the [`ResolvedInput`].

use crate::error::ScanError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Where the bytes live.
#[derive(Debug)]
pub enum Location {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; downloaded to a temp directory kept alive here.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

/// A local file ready for classification.
#[derive(Debug)]
pub struct ResolvedInput {
    pub location: Location,
    /// Display name (last path segment or server-supplied name).
    pub file_name: Option<String>,
    /// Declared or sniffed MIME type.
    pub mime_type: Option<String>,
}

impl ResolvedInput {
    /// Get the path to the file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match &self.location {
            Location::Local(p) => p,
            Location::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local file.
///
/// URLs are downloaded to a temporary directory; local paths are validated
/// for existence and readability.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ScanError> {
    if input.trim().is_empty() {
        return Err(ScanError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

/// Resolve a local file path, sniffing its MIME type.
pub fn resolve_local(path: &Path) -> Result<ResolvedInput, ScanError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(ScanError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(ScanError::InvalidInput {
            input: path.display().to_string(),
        });
    }

    // Check read permission by attempting to open
    if let Err(e) = std::fs::File::open(&path) {
        return Err(if e.kind() == std::io::ErrorKind::PermissionDenied {
            ScanError::PermissionDenied { path }
        } else {
            ScanError::FileNotFound { path }
        });
    }

    let mime_type = infer::get_from_path(&path)
        .ok()
        .flatten()
        .map(|kind| kind.mime_type().to_string());
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    debug!(
        "Resolved local file: {} (mime={:?})",
        path.display(),
        mime_type
    );
    Ok(ResolvedInput {
        location: Location::Local(path),
        file_name,
        mime_type,
    })
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ScanError> {
    info!("Downloading from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ScanError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ScanError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ScanError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header = |name: reqwest::header::HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let declared_mime = header(reqwest::header::CONTENT_TYPE).and_then(|v| media_type(&v));
    let file_name = header(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| filename_from_disposition(&v))
        .or_else(|| filename_from_url(url));

    let temp_dir = TempDir::new().map_err(|e| ScanError::Internal(e.to_string()))?;
    let file_path = temp_dir
        .path()
        .join(file_name.as_deref().unwrap_or("download.bin"));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ScanError::Internal(format!("Failed to write temp file: {}", e)))?;

    // No declared type: fall back to the magic bytes.
    let mime_type =
        declared_mime.or_else(|| infer::get(&bytes).map(|k| k.mime_type().to_string()));

    info!(
        "Downloaded {} bytes to: {} (mime={:?})",
        bytes.len(),
        file_path.display(),
        mime_type
    );

    Ok(ResolvedInput {
        location: Location::Downloaded {
            path: file_path,
            _temp_dir: temp_dir,
        },
        file_name,
        mime_type,
    })
}

/// Media type of a `Content-Type` value, without parameters.
pub fn media_type(content_type: &str) -> Option<String> {
    let media = content_type.split(';').next()?.trim();
    if media.is_empty() {
        None
    } else {
        Some(media.to_string())
    }
}

static RE_DISPOSITION_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'[^']*')?"?([^";]+)"?"#).unwrap()
});

/// File name from a `Content-Disposition` header value.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let caps = RE_DISPOSITION_FILENAME.captures(value)?;
    sanitize_file_name(caps[1].trim())
}

/// Last non-empty path segment of a URL.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?.to_string();
    sanitize_file_name(&last)
}

/// Keep only the final component so a hostile name cannot escape the temp dir.
fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}
