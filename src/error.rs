//! Error types for the cvpress library.
//!
//! Normalisation is a total function and never produces an error; everything
//! here comes from the conversion side:
//!
//! * **Input**: the source Markdown file is missing or unreadable. Only the
//!   file-based entry points ([`crate::convert_file`], [`crate::convert_to_file`])
//!   can raise these; the core conversion takes text already in memory.
//! * **Conversion**: the external converter failed, timed out, or could not be
//!   launched. The converter's own diagnostic is carried verbatim so callers
//!   can show the user exactly what Pandoc or LaTeX complained about.
//! * **Output / config / internal**: writing the result, invalid builder
//!   settings, temp-area allocation.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the cvpress library.
#[derive(Debug, Error)]
pub enum CvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source Markdown file was not found at the given path.
    #[error("Markdown file '{}' does not exist.", path.display())]
    MissingInput { path: PathBuf },

    /// Source file exists but could not be read as UTF-8 text.
    #[error("Failed to read '{}': {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The converter exited unsuccessfully or produced no usable PDF.
    ///
    /// `diagnostic` is the tool's own output, unaltered.
    #[error("Pandoc failed: {diagnostic}")]
    ConversionFailed { diagnostic: String },

    /// The converter did not finish within the configured timeout and was killed.
    ///
    /// Only the Pandoc process itself is killed. A LaTeX engine it already
    /// started is not signalled and may run until it finishes on its own.
    #[error("Conversion timed out after {secs}s\nIncrease --timeout or check the template for an infinite loop.")]
    ConversionTimedOut { secs: u64 },

    /// The converter binary could not be launched at all.
    #[error("Converter '{program}' is not available: {reason}\nInstall Pandoc or point --pandoc at it.")]
    ConverterUnavailable { program: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{}': {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CvError {
    /// The converter's raw diagnostic, if this error carries one.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            CvError::ConversionFailed { diagnostic } => Some(diagnostic),
            _ => None,
        }
    }
}
