//! Configuration types for Markdown-to-PDF conversion.
//!
//! Per-call inputs (Markdown text, template, filters) are passed directly to
//! [`crate::convert`]; [`ConversionConfig`] only holds the tool-level knobs
//! that stay fixed across calls: which Pandoc binary to run, which LaTeX
//! engine it uses, and an optional deadline. Built via its
//! [`ConversionConfigBuilder`].

use crate::error::CvError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default Markdown CV used by the CLI when no input is given.
pub const DEFAULT_INPUT: &str = "demos/default.md";

/// Default destination of the rendered PDF.
pub const DEFAULT_OUTPUT: &str = "output/cv.pdf";

/// Default LaTeX template.
pub const DEFAULT_TEMPLATE: &str = "templates/modern.tex";

/// Default Lua filter chain, in application order.
pub const DEFAULT_FILTERS: [&str; 2] = ["filters/inline_dates.lua", "filters/columns.lua"];

/// Configuration shared by every conversion.
///
/// # Example
/// ```rust
/// use cvpress::{ConversionConfig, PdfEngine};
///
/// let config = ConversionConfig::builder()
///     .pandoc_path("/usr/local/bin/pandoc")
///     .pdf_engine(PdfEngine::LuaLaTeX)
///     .timeout_secs(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.pdf_engine, PdfEngine::LuaLaTeX);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Pandoc executable, looked up on `PATH` when not absolute. Default: `pandoc`.
    pub pandoc_path: PathBuf,

    /// LaTeX engine Pandoc typesets with. Default: [`PdfEngine::XeLaTeX`].
    ///
    /// Templates that load `fontspec` need XeLaTeX or LuaLaTeX.
    pub pdf_engine: PdfEngine,

    /// Kill the converter after this many seconds. Default: `None` (wait forever).
    ///
    /// The kill reaches the Pandoc process only, not its LaTeX engine child.
    pub timeout_secs: Option<u64>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pandoc_path: PathBuf::from("pandoc"),
            pdf_engine: PdfEngine::default(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("pandoc_path", &self.pandoc_path.display())
            .field("pdf_engine", &self.pdf_engine.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn pandoc_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.pandoc_path = path.as_ref().to_path_buf();
        self
    }

    pub fn pdf_engine(mut self, engine: PdfEngine) -> Self {
        self.config.pdf_engine = engine;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    /// Set or clear the timeout in one call; handy when mapping an optional CLI flag.
    pub fn timeout(mut self, secs: Option<u64>) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, CvError> {
        let c = &self.config;
        if c.pandoc_path.as_os_str().is_empty() {
            return Err(CvError::InvalidConfig(
                "Pandoc path must not be empty".into(),
            ));
        }
        if c.timeout_secs == Some(0) {
            return Err(CvError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// LaTeX engine passed to Pandoc as `--pdf-engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfEngine {
    /// Unicode + system fonts via fontspec. (default)
    #[default]
    XeLaTeX,
    /// Unicode + fontspec, Lua-scriptable.
    LuaLaTeX,
    /// Classic pdfTeX; no system fonts.
    PdfLaTeX,
    /// Self-contained Rust TeX engine, fetches packages on demand.
    Tectonic,
}

impl PdfEngine {
    /// The identifier Pandoc expects after `--pdf-engine=`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfEngine::XeLaTeX => "xelatex",
            PdfEngine::LuaLaTeX => "lualatex",
            PdfEngine::PdfLaTeX => "pdflatex",
            PdfEngine::Tectonic => "tectonic",
        }
    }
}

impl fmt::Display for PdfEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
