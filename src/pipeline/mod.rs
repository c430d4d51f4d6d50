//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! ## Data Flow
//!
//! ```text
//! raw Markdown ──▶ normalize ──▶ request ──▶ invoke ──▶ PDF bytes
//!                  (spacing)     (argv)      (pandoc)
//! ```
//!
//! 1. [`normalize`]: pure text pass inserting the blank lines Pandoc needs
//! 2. [`request`]: bundle text, template, filters and engine; build argv
//! 3. [`invoke`]: run Pandoc in a private temp area and collect the PDF;
//!    the only stage with I/O

pub mod invoke;
pub mod normalize;
pub mod request;
