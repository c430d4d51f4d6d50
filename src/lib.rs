//! # cvpress
//!
//! Turn a hand-edited Markdown CV into a typeset PDF via Pandoc.
//!
//! ## Why this crate?
//!
//! Pandoc + a LaTeX template + a couple of Lua filters make a good résumé
//! pipeline, but Pandoc's Markdown reader is strict about blank lines: a
//! heading glued to the paragraph below it, or a bullet list glued to a
//! blockquote, silently merges into one block. cvpress fixes the spacing
//! first, then drives a single, hermetic Pandoc call and hands back the PDF
//! bytes or Pandoc's own diagnostic.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Normalize  blank lines around headings, lists, quotes, metadata
//!  ├─ 2. Request    template + ordered Lua filters + PDF engine → argv
//!  ├─ 3. Invoke     pandoc in a private temp dir, Markdown on stdin
//!  └─ 4. Output     %PDF bytes, or ConversionFailed { diagnostic }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cvpress::{convert, normalize, FilterRef, TemplateRef};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let raw = std::fs::read_to_string("cv.md")?;
//!     let pdf = convert(
//!         &normalize(&raw),
//!         TemplateRef::path("templates/modern.tex"),
//!         &[FilterRef::from("filters/inline_dates.lua"), FilterRef::from("filters/columns.lua")],
//!     )
//!     .await?;
//!     std::fs::write("cv.pdf", pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cvpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Requirements
//!
//! Pandoc and a LaTeX engine (XeLaTeX by default) must be installed. The
//! templates and filters are passed through by path and never interpreted.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PdfEngine};
pub use convert::{
    convert, convert_file, convert_sync, convert_to_file, convert_with_config, converter_version,
    read_markdown,
};
pub use error::CvError;
pub use output::ConversionReport;
pub use pipeline::invoke::ConverterInfo;
pub use pipeline::normalize::normalize;
pub use pipeline::request::{ConversionRequest, FilterRef, TemplateRef};
pub use session::{FilterSet, Session, TemplateChoice};
