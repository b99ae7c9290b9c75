use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::widgets::{WidgetError, WidgetKind};

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Slug of the document, used for logging and the comments thread.
    pub slug: String,
    /// Markdown body with the front matter already removed.
    pub markdown: String,
    /// Directory relative image references resolve against. When absent,
    /// images are left untouched and never sized.
    #[serde(default)]
    pub document_dir: Option<PathBuf>,
    /// Site-relative URL of the rendered page (`/slug/`), used to rewrite
    /// local asset references.
    pub public_path: String,
}

impl RenderRequest {
    pub fn new(slug: impl Into<String>, markdown: impl Into<String>) -> Self {
        let slug = slug.into();
        let public_path = format!("/{slug}/");
        Self {
            slug,
            markdown: markdown.into(),
            document_dir: None,
            public_path,
        }
    }

    pub fn with_document_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.document_dir = Some(dir.into());
        self
    }
}

/// Entry of the generated table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: u8,
    pub anchor: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    Image,
    Link,
}

/// Image or link target found in the body, kept for corpus linting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Target exactly as written in the markdown.
    pub target: String,
    /// 1-based line within the markdown body.
    pub line: usize,
    /// Images only: the alt text was empty.
    #[serde(default)]
    pub missing_alt: bool,
}

/// Content-level metrics surfaced alongside rendered HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContentMetrics {
    pub word_count: u32,
    pub reading_time_minutes: u32,
    pub internal_links_count: u32,
    pub external_links_count: u32,
    pub images_count: u32,
    pub code_blocks_count: u32,
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Sanitised HTML ready to be placed in a page template.
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub references: Vec<Reference>,
    /// Widgets encountered, in document order.
    pub widgets: Vec<WidgetKind>,
    pub contains_code: bool,
    #[serde(default)]
    pub metrics: ContentMetrics,
}

/// Structured errors surfaced by the rendering pipeline. These map onto
/// build failures without leaking implementation details.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("widget error on line {line}: {source}")]
    Widget {
        line: usize,
        #[source]
        source: WidgetError,
    },
    #[error("widget `<{widget}>` on line {line}: {message}")]
    WidgetPlacement {
        widget: WidgetKind,
        line: usize,
        message: String,
    },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

impl RenderError {
    /// Body line the error points at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            RenderError::Widget { line, .. } | RenderError::WidgetPlacement { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
