//! Editing session: the state an editor front-end keeps between conversions.
//!
//! A [`Session`] is an explicit value the caller owns and passes around; the
//! conversion core itself holds no state. It tracks the Markdown being edited,
//! the chosen template (a bundled one or a user-edited custom source), which
//! bundled Lua filters are enabled, and the last PDF that was generated.
//!
//! A failed [`Session::generate`] returns the error and leaves the previously
//! generated PDF in place, so a preview can keep showing the last good render.

use crate::config::ConversionConfig;
use crate::convert::convert_with_config;
use crate::error::CvError;
use crate::pipeline::normalize::normalize;
use crate::pipeline::request::{FilterRef, TemplateRef};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Template selection for a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TemplateChoice {
    /// `templates/modern.tex` (default)
    #[default]
    Modern,
    /// `templates/harvard.tex`
    Harvard,
    /// A custom LaTeX template held in memory.
    Custom(String),
}

impl TemplateChoice {
    pub fn label(&self) -> &'static str {
        match self {
            TemplateChoice::Modern => "Modern",
            TemplateChoice::Harvard => "Harvard",
            TemplateChoice::Custom(_) => "Custom",
        }
    }

    /// Path of a bundled template relative to the resources directory.
    pub fn bundled_path(&self) -> Option<&'static str> {
        match self {
            TemplateChoice::Modern => Some("templates/modern.tex"),
            TemplateChoice::Harvard => Some("templates/harvard.tex"),
            TemplateChoice::Custom(_) => None,
        }
    }
}

/// Which bundled Lua filters run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSet {
    /// `filters/columns.lua`: multi-column layout blocks.
    pub columns: bool,
    /// `filters/inline_dates.lua`: right-aligned dates on entry lines.
    pub inline_dates: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            columns: true,
            inline_dates: true,
        }
    }
}

impl FilterSet {
    /// Enabled filters resolved against `resources`, columns first.
    pub fn resolve(&self, resources: &Path) -> Vec<FilterRef> {
        let mut filters = Vec::with_capacity(2);
        if self.columns {
            filters.push(FilterRef::new(resources.join("filters/columns.lua")));
        }
        if self.inline_dates {
            filters.push(FilterRef::new(resources.join("filters/inline_dates.lua")));
        }
        filters
    }
}

/// Caller-owned editing state.
#[derive(Debug, Clone)]
pub struct Session {
    markdown: String,
    template: TemplateChoice,
    filters: FilterSet,
    resources: PathBuf,
    last_pdf: Option<Vec<u8>>,
}

impl Session {
    /// New session editing `markdown`, with bundled resources under the
    /// current directory.
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            template: TemplateChoice::default(),
            filters: FilterSet::default(),
            resources: PathBuf::from("."),
            last_pdf: None,
        }
    }

    /// Look for `templates/` and `filters/` under `dir` instead.
    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources = dir.into();
        self
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn set_markdown(&mut self, markdown: impl Into<String>) {
        self.markdown = markdown.into();
    }

    pub fn template(&self) -> &TemplateChoice {
        &self.template
    }

    pub fn select_template(&mut self, choice: TemplateChoice) {
        self.template = choice;
    }

    pub fn filters(&self) -> FilterSet {
        self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }

    /// The last successfully generated PDF, if any.
    pub fn last_pdf(&self) -> Option<&[u8]> {
        self.last_pdf.as_deref()
    }

    /// Template reference for the current choice.
    pub fn template_ref(&self) -> TemplateRef {
        if let TemplateChoice::Custom(source) = &self.template {
            return TemplateRef::inline(source.clone());
        }
        TemplateRef::path(self.resources.join(self.template.bundled_path().unwrap_or_default()))
    }

    /// Source text of the active template.
    pub async fn template_source(&self) -> Result<String, CvError> {
        match &self.template {
            TemplateChoice::Custom(source) => Ok(source.clone()),
            bundled => {
                let rel = bundled.bundled_path().unwrap_or_default();
                let path = self.resources.join(rel);
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| CvError::ReadFailed { path, source: e })
            }
        }
    }

    /// Switch to a custom template seeded with the active template's source.
    ///
    /// No-op when a custom template is already active.
    pub async fn edit_as_custom(&mut self) -> Result<(), CvError> {
        if matches!(self.template, TemplateChoice::Custom(_)) {
            return Ok(());
        }
        let source = self.template_source().await?;
        self.template = TemplateChoice::Custom(source);
        Ok(())
    }

    /// Normalise the current Markdown, convert it, and keep the PDF.
    ///
    /// On failure the error is returned and the previous PDF is kept.
    pub async fn generate(&mut self, config: &ConversionConfig) -> Result<&[u8], CvError> {
        let markdown = normalize(&self.markdown);
        let filters = self.filters.resolve(&self.resources);
        match convert_with_config(&markdown, self.template_ref(), &filters, config).await {
            Ok(pdf) => {
                info!("Session PDF regenerated ({} template)", self.template.label());
                Ok(self.last_pdf.insert(pdf).as_slice())
            }
            Err(e) => {
                warn!("Failed to generate PDF; keeping previous render: {}", e);
                Err(e)
            }
        }
    }
}
