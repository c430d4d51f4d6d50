//! Conversion request: the inputs of one Pandoc call and their argument vector.
//!
//! A [`ConversionRequest`] is built fresh for every conversion and owned by
//! the invoker for the duration of that call. It knows how to turn itself into
//! Pandoc's command line once the invoker has decided where the template lives
//! and where the PDF should be written; it never touches the filesystem itself.

use crate::config::PdfEngine;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Pandoc reader used for the input.
pub const SOURCE_FORMAT: &str = "markdown";

/// Pandoc writer; always PDF.
pub const TARGET_FORMAT: &str = "pdf";

/// Where the LaTeX template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// A template file on disk (or any locator Pandoc accepts for `--template`).
    Path(PathBuf),
    /// Template source held in memory, e.g. a user-edited custom template.
    /// Written into the call's private temp area before Pandoc runs.
    Inline(String),
}

impl TemplateRef {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        TemplateRef::Path(path.into())
    }

    pub fn inline(source: impl Into<String>) -> Self {
        TemplateRef::Inline(source.into())
    }

    /// Human-readable label for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            TemplateRef::Path(p) => p.display().to_string(),
            TemplateRef::Inline(src) => format!("<inline template, {} bytes>", src.len()),
        }
    }
}

impl From<PathBuf> for TemplateRef {
    fn from(p: PathBuf) -> Self {
        TemplateRef::Path(p)
    }
}

impl From<&Path> for TemplateRef {
    fn from(p: &Path) -> Self {
        TemplateRef::Path(p.to_path_buf())
    }
}

/// A Lua filter passed to Pandoc with `--lua-filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRef(PathBuf);

impl FilterRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FilterRef(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for FilterRef {
    fn from(p: PathBuf) -> Self {
        FilterRef(p)
    }
}

impl From<&Path> for FilterRef {
    fn from(p: &Path) -> Self {
        FilterRef(p.to_path_buf())
    }
}

impl From<&str> for FilterRef {
    fn from(p: &str) -> Self {
        FilterRef(PathBuf::from(p))
    }
}

/// Everything one conversion needs.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Markdown fed to Pandoc on stdin (normally already normalised).
    pub markdown: String,
    pub template: TemplateRef,
    /// Applied by Pandoc in this order.
    pub filters: Vec<FilterRef>,
    pub engine: PdfEngine,
}

impl ConversionRequest {
    pub fn new(
        markdown: impl Into<String>,
        template: TemplateRef,
        filters: Vec<FilterRef>,
        engine: PdfEngine,
    ) -> Self {
        Self {
            markdown: markdown.into(),
            template,
            filters,
            engine,
        }
    }

    /// Build Pandoc's argument vector.
    ///
    /// `template_path` is the resolved template location (the request's own
    /// path, or the file an inline template was written to). Filters keep
    /// their order; Pandoc applies `--lua-filter` flags left to right.
    pub fn to_args(&self, template_path: &Path, output_path: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(5 + self.filters.len());
        args.push(OsString::from(format!("--from={SOURCE_FORMAT}")));
        args.push(OsString::from(format!("--to={TARGET_FORMAT}")));
        args.push(flag_with_path("--output=", output_path));
        args.push(flag_with_path("--template=", template_path));
        args.push(OsString::from(format!("--pdf-engine={}", self.engine.as_str())));
        for filter in &self.filters {
            args.push(flag_with_path("--lua-filter=", filter.as_path()));
        }
        args
    }
}

/// `--flag=<path>` without forcing the path through UTF-8.
fn flag_with_path(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path.as_os_str());
    arg
}
