//! CLI binary for barcode-scan.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ScanConfig` and prints results.

use anyhow::{Context, Result};
use barcode_scan::pipeline::encode::encode_png_base64;
use barcode_scan::{
    scan, scan_to_dir, BarcodeResult, CropRect, ScanConfig, ScanListener, ScanNotice,
    ScanOutcome, ScanStats, SourceKind,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI listener using indicatif ─────────────────────────────────────────────

/// Terminal listener: a spinner while the input is opened, then a page bar
/// with one log line per scanned page.
struct CliListener {
    bar: ProgressBar,
}

impl CliListener {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ScanListener for CliListener {
    fn on_scan_start(&self, source: SourceKind, page_count: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(page_count as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Scanning");
        if source == SourceKind::Pdf {
            self.bar.println(format!("{} PDF with {page_count} pages", bold("◆")));
        }
    }

    fn on_page_scanned(&self, page_num: usize, total_pages: usize, result_count: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{result_count} codes")),
        ));
        self.bar.inc(1);
    }

    fn on_detected(&self, _results: &[BarcodeResult]) {
        self.bar.finish_and_clear();
    }

    fn on_notice(&self, _notice: &ScanNotice) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print every code in a PDF, one per line
  barcode-scan ticket.pdf

  # Scan a photo taken sideways
  barcode-scan --rotation 90 photo.jpg

  # Treat a download served as binary/octet-stream as a PDF
  barcode-scan --mime binary/octet-stream --name pass.pdf https://example.com/dl?id=7

  # Save the cropped codes as JPEG plus results.json
  barcode-scan --save-crops ./out invoice.pdf

  # JSON with base64 PNG crops
  barcode-scan --json --with-images label.png > codes.json

SUPPORTED INPUT:
  application/pdf, binary/octet-stream + .pdf name,
  image/bmp, image/jpeg, image/png, image/gif, image/tiff

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Overrides the log filter
"#;

/// Find and decode barcodes in images and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "barcode-scan",
    version,
    about = "Find and decode barcodes in images and PDF documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL.
    input: String,

    /// Declared MIME type; overrides the sniffed type.
    #[arg(long, env = "BARCODE_SCAN_MIME")]
    mime: Option<String>,

    /// Display file name; overrides the name from the path or URL.
    #[arg(long, env = "BARCODE_SCAN_NAME")]
    name: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "BARCODE_SCAN_PASSWORD")]
    password: Option<String>,

    /// PDF render upscale factor (0.5–8.0).
    #[arg(long, env = "BARCODE_SCAN_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Clockwise rotation making an image upright (0, 90, 180, 270).
    #[arg(long, env = "BARCODE_SCAN_ROTATION", default_value_t = 0)]
    rotation: u32,

    /// Output structured JSON instead of one value per line.
    #[arg(long, env = "BARCODE_SCAN_JSON")]
    json: bool,

    /// Include base64 PNG crops in JSON output.
    #[arg(long, requires = "json")]
    with_images: bool,

    /// Save crops as result-<n>.jpg and results.json in this directory.
    #[arg(long, env = "BARCODE_SCAN_SAVE_CROPS")]
    save_crops: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BARCODE_SCAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "BARCODE_SCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BARCODE_SCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "BARCODE_SCAN_QUIET")]
    quiet: bool,
}

/// JSON shape printed by `--json`.
#[derive(Serialize)]
struct JsonOutput {
    results: Vec<JsonResult>,
    stats: ScanStats,
}

#[derive(Serialize)]
struct JsonResult {
    raw_value: String,
    bounds: CropRect,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_png_base64: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let listener = show_progress.then(CliListener::new);
    let config = build_config(&cli, listener)?;

    // ── Run scan ─────────────────────────────────────────────────────────
    let outcome = if let Some(ref dir) = cli.save_crops {
        let (outcome, written) = scan_to_dir(&cli.input, dir, &config)
            .await
            .context("Scan failed")?;
        if !cli.quiet && !written.is_empty() {
            eprintln!(
                "{} {} files  →  {}",
                green("✔"),
                written.len(),
                bold(&dir.display().to_string())
            );
        }
        outcome
    } else {
        scan(&cli.input, &config).await.context("Scan failed")?
    };

    let output = match outcome {
        ScanOutcome::Detected(output) => output,
        ScanOutcome::Skipped(notice) => {
            // A declined input is a message for the user, not a failure.
            eprintln!("{} {}", yellow("⚠"), notice);
            return Ok(());
        }
    };

    if cli.json {
        let results = output
            .results
            .iter()
            .map(|r| to_json(r, cli.with_images))
            .collect::<Result<Vec<_>>>()?;
        let json = serde_json::to_string_pretty(&JsonOutput {
            results,
            stats: output.stats.clone(),
        })
        .context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for value in output.raw_values() {
            writeln!(handle, "{value}").context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {} codes from {} pages in {}ms",
            green("✔"),
            bold(&output.stats.result_count.to_string()),
            output.stats.page_count,
            output.stats.total_duration_ms,
        );
        if output.stats.skipped_detections > 0 {
            eprintln!(
                "  {}",
                dim(&format!(
                    "{} incomplete detections skipped",
                    output.stats.skipped_detections
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ScanConfig`.
fn build_config(cli: &Cli, listener: Option<Arc<CliListener>>) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder()
        .scale_factor(cli.scale)
        .rotation_degrees(cli.rotation)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref mime) = cli.mime {
        builder = builder.mime_type(mime.as_str());
    }
    if let Some(ref name) = cli.name {
        builder = builder.file_name(name.as_str());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.as_str());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(listener) = listener {
        builder = builder.listener(listener);
    }

    builder.build().context("Invalid configuration")
}

fn to_json(result: &BarcodeResult, with_images: bool) -> Result<JsonResult> {
    let image_png_base64 = match (&result.image, with_images) {
        (Some(img), true) => Some(encode_png_base64(img).context("Failed to encode crop")?),
        _ => None,
    };
    Ok(JsonResult {
        raw_value: result.raw_value.clone(),
        bounds: result.bounds,
        page: result.page,
        format: result.format.clone(),
        image_png_base64,
    })
}
