//! Conversion entry points.
//!
//! [`convert`] and [`convert_with_config`] are the core contract: Markdown
//! text in, PDF bytes out, one Pandoc call, no retries, no caching. The
//! file-level helpers ([`convert_file`], [`convert_to_file`]) add what a CLI
//! needs on top: the missing-input check, optional normalisation, and an
//! atomic write of the result.

use crate::config::ConversionConfig;
use crate::error::CvError;
use crate::output::ConversionReport;
use crate::pipeline::invoke::{self, ConverterInfo};
use crate::pipeline::normalize::normalize;
use crate::pipeline::request::{ConversionRequest, FilterRef, TemplateRef};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert Markdown text to PDF with the default configuration
/// (`pandoc` from `PATH`, XeLaTeX, no timeout).
///
/// The text is passed to Pandoc as-is; call [`crate::normalize`] first for
/// hand-written input.
///
/// # Errors
/// [`CvError::ConversionFailed`] with Pandoc's diagnostic when the converter
/// fails; no partial bytes are ever returned.
///
/// # Example
/// ```rust,no_run
/// use cvpress::{convert, normalize, FilterRef, TemplateRef};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), cvpress::CvError> {
/// let md = normalize("# Jane Doe\nEngineer");
/// let pdf = convert(
///     &md,
///     TemplateRef::path("templates/modern.tex"),
///     &[FilterRef::from("filters/columns.lua")],
/// )
/// .await?;
/// assert!(pdf.starts_with(b"%PDF"));
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    markdown: &str,
    template: TemplateRef,
    filters: &[FilterRef],
) -> Result<Vec<u8>, CvError> {
    convert_with_config(markdown, template, filters, &ConversionConfig::default()).await
}

/// Convert Markdown text to PDF using an explicit configuration.
pub async fn convert_with_config(
    markdown: &str,
    template: TemplateRef,
    filters: &[FilterRef],
    config: &ConversionConfig,
) -> Result<Vec<u8>, CvError> {
    info!(
        "Converting {} bytes of Markdown (template: {}, {} filters, engine: {})",
        markdown.len(),
        template.describe(),
        filters.len(),
        config.pdf_engine
    );
    let request = ConversionRequest::new(markdown, template, filters.to_vec(), config.pdf_engine);
    invoke::run(&request, config).await
}

/// Synchronous wrapper around [`convert_with_config`].
///
/// Creates a temporary single-threaded tokio runtime internally; the calling
/// thread blocks until Pandoc exits. Must not be called from inside a runtime.
pub fn convert_sync(
    markdown: &str,
    template: TemplateRef,
    filters: &[FilterRef],
    config: &ConversionConfig,
) -> Result<Vec<u8>, CvError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_with_config(markdown, template, filters, config))
}

/// Read a Markdown file, optionally normalise it, and convert it to PDF.
///
/// # Errors
/// [`CvError::MissingInput`] when `input` does not exist; otherwise as
/// [`convert_with_config`].
pub async fn convert_file(
    input: impl AsRef<Path>,
    template: TemplateRef,
    filters: &[FilterRef],
    preprocess: bool,
    config: &ConversionConfig,
) -> Result<Vec<u8>, CvError> {
    let markdown = read_markdown(input.as_ref(), preprocess).await?;
    convert_with_config(&markdown, template, filters, config).await
}

/// Convert a Markdown file and write the PDF to `output`.
///
/// Parent directories are created. The PDF is written to a sibling temp file
/// and renamed into place, so a failed run never leaves a truncated PDF and
/// never touches a previously generated one.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    template: TemplateRef,
    filters: &[FilterRef],
    preprocess: bool,
    config: &ConversionConfig,
) -> Result<ConversionReport, CvError> {
    let start = Instant::now();
    let input = input.as_ref();
    let path = output.as_ref();
    let template_label = template.describe();

    let pdf = convert_file(input, template, filters, preprocess, config).await?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CvError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &pdf)
        .await
        .map_err(|e| CvError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(CvError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }

    info!("PDF written to {}", path.display());

    Ok(ConversionReport {
        input: input.to_path_buf(),
        output: path.to_path_buf(),
        template: template_label,
        filters: filters.iter().map(|f| f.as_path().to_path_buf()).collect(),
        pdf_engine: config.pdf_engine,
        normalized: preprocess,
        pdf_bytes: pdf.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Report which Pandoc the configuration points at.
///
/// Does not convert anything; useful as a preflight check.
pub async fn converter_version(config: &ConversionConfig) -> Result<ConverterInfo, CvError> {
    invoke::probe_version(config).await
}

/// Load a Markdown source file, normalising it when asked.
pub async fn read_markdown(input: &Path, preprocess: bool) -> Result<String, CvError> {
    if !input.exists() {
        return Err(CvError::MissingInput {
            path: input.to_path_buf(),
        });
    }

    let text = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| CvError::ReadFailed {
            path: input.to_path_buf(),
            source: e,
        })?;
    debug!("Read {} bytes from {}", text.len(), input.display());

    Ok(if preprocess { normalize(&text) } else { text })
}
