//! Result summaries returned by the file-level entry points.

use crate::config::PdfEngine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a [`crate::convert_to_file`] run did.
///
/// Serialisable so the CLI can emit it with `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Markdown source file.
    pub input: PathBuf,
    /// Where the PDF was written.
    pub output: PathBuf,
    /// Template as passed to Pandoc (path, or an inline-template label).
    pub template: String,
    /// Lua filters, in application order.
    pub filters: Vec<PathBuf>,
    pub pdf_engine: PdfEngine,
    /// Whether the normalisation pass ran.
    pub normalized: bool,
    /// Size of the written PDF.
    pub pdf_bytes: usize,
    /// Wall-clock time including reading the input and writing the output.
    pub duration_ms: u64,
}
