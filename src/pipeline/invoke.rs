//! Pandoc invocation: run one conversion in a private, self-cleaning temp area.
//!
//! ## Why a temp directory per call?
//!
//! Pandoc's PDF writer needs an output *path*, and inline templates need a
//! file Pandoc can read. Allocating a fresh `TempDir` for every call gives
//! concurrent conversions disjoint paths, and its `Drop` removes the directory
//! on every exit path: success, `?` propagation, timeout, or panic.
//!
//! ## Failure translation
//!
//! Pandoc and LaTeX already explain what went wrong; we do not parse or
//! rephrase it. Any unsuccessful outcome becomes
//! [`CvError::ConversionFailed`] carrying the tool's stderr verbatim (stdout
//! when stderr is empty). A PDF is only returned when the exit status is zero
//! *and* the artifact starts with the `%PDF` magic.

use crate::config::ConversionConfig;
use crate::error::CvError;
use crate::pipeline::request::{ConversionRequest, TemplateRef};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// File name of the PDF inside the temp area.
pub const OUTPUT_FILE: &str = "cv.pdf";

/// File name an inline template is materialised to.
pub const INLINE_TEMPLATE_FILE: &str = "template.tex";

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Run Pandoc once for `request` and return the PDF bytes.
pub async fn run(request: &ConversionRequest, config: &ConversionConfig) -> Result<Vec<u8>, CvError> {
    let start = Instant::now();

    let workdir = tempfile::Builder::new()
        .prefix("cvpress-")
        .tempdir()
        .map_err(|e| CvError::Internal(format!("Failed to create temp directory: {e}")))?;
    let output_path = workdir.path().join(OUTPUT_FILE);
    let template_path = resolve_template(&request.template, workdir.path()).await?;

    let args = request.to_args(&template_path, &output_path);
    debug!(
        "Running {} {:?} in {}",
        config.pandoc_path.display(),
        args,
        workdir.path().display()
    );

    let mut child = Command::new(&config.pandoc_path)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CvError::ConversionFailed {
            diagnostic: format!("Failed to run {}: {e}", config.pandoc_path.display()),
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| CvError::Internal("Converter stdin was not captured".into()))?;
    let markdown = request.markdown.as_bytes();

    // Feed stdin while draining stdout/stderr so neither pipe can fill up and
    // stall the other side.
    let exchange = async move {
        let feed = async move {
            let written = stdin.write_all(markdown).await;
            drop(stdin);
            written
        };
        tokio::join!(feed, child.wait_with_output())
    };

    let (fed, output) = match config.timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), exchange)
            .await
            .map_err(|_| {
                warn!("Converter exceeded {}s; killed", secs);
                CvError::ConversionTimedOut { secs }
            })?,
        None => exchange.await,
    };

    let output = output.map_err(|e| CvError::ConversionFailed {
        diagnostic: format!("Failed to wait for {}: {e}", config.pandoc_path.display()),
    })?;

    if let Err(e) = fed {
        // Pandoc may exit before reading stdin (e.g. missing template); the
        // exit status below is what matters.
        if e.kind() != ErrorKind::BrokenPipe {
            warn!("Failed to write Markdown to converter stdin: {}", e);
        }
    }

    if !output.status.success() {
        let diagnostic = diagnostic_text(&output);
        debug!("Converter failed with {}: {}", output.status, diagnostic);
        return Err(CvError::ConversionFailed { diagnostic });
    }

    let bytes = tokio::fs::read(&output_path)
        .await
        .map_err(|e| CvError::ConversionFailed {
            diagnostic: format!("Converter reported success but wrote no PDF: {e}"),
        })?;

    if !bytes.starts_with(PDF_MAGIC) {
        let head: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(CvError::ConversionFailed {
            diagnostic: format!("Converter output is not a PDF (first bytes: {head:?})"),
        });
    }

    info!(
        "Rendered {} bytes of PDF in {}ms",
        bytes.len(),
        start.elapsed().as_millis()
    );

    Ok(bytes)
}

/// Decide which path Pandoc gets for `--template`.
async fn resolve_template(template: &TemplateRef, workdir: &Path) -> Result<PathBuf, CvError> {
    match template {
        TemplateRef::Path(path) => {
            if !path.exists() {
                // Pandoc also searches its data directory, so this is not fatal.
                debug!("Template {} not found locally; leaving it to Pandoc", path.display());
            }
            Ok(path.clone())
        }
        TemplateRef::Inline(source) => {
            let path = workdir.join(INLINE_TEMPLATE_FILE);
            tokio::fs::write(&path, source)
                .await
                .map_err(|e| CvError::Internal(format!("Failed to write inline template: {e}")))?;
            Ok(path)
        }
    }
}

/// The converter's own complaint: stderr, else stdout, else the exit status.
fn diagnostic_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.into_owned();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return stdout.into_owned();
    }
    format!("converter exited with {}", output.status)
}

// ── Version probe ───────────────────────────────────────────────────────────

static RE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^pandoc(?:\.exe)?\s+v?(\d+(?:\.\d+)+)").unwrap());

/// What `pandoc --version` reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConverterInfo {
    /// Binary that was probed.
    pub program: String,
    /// Dotted version, e.g. `3.1.11`.
    pub version: String,
    /// First line of the banner, verbatim.
    pub banner: String,
}

/// Run `<pandoc> --version` and parse the result.
pub async fn probe_version(config: &ConversionConfig) -> Result<ConverterInfo, CvError> {
    let program = config.pandoc_path.display().to_string();
    let output = Command::new(&config.pandoc_path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| CvError::ConverterUnavailable {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(CvError::ConverterUnavailable {
            program,
            reason: diagnostic_text(&output),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version(&stdout)
        .map(|version| ConverterInfo {
            program: program.clone(),
            version,
            banner: stdout.lines().next().unwrap_or_default().to_string(),
        })
        .ok_or_else(|| CvError::ConverterUnavailable {
            program,
            reason: format!("unrecognised --version output: {:?}", stdout.trim()),
        })
}

fn parse_version(banner: &str) -> Option<String> {
    RE_VERSION
        .captures(banner)
        .map(|caps| caps[1].to_string())
}
