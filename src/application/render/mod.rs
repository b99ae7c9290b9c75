//! Markdown rendering pipeline.
//!
//! The pipeline is pure: it accepts a markdown body, produces deterministic
//! HTML plus the metadata the linter and templates need, and surfaces
//! structured errors. Reading image files to size them is the only I/O.

mod service;
mod types;

pub use service::{
    ComrakRenderService, CommentsEmbed, RenderConfigError, RenderPipelineConfig,
    configure_render_service, render_service,
};
pub use types::{
    ContentMetrics, Reference, ReferenceKind, RenderError, RenderOutput, RenderRequest,
    RenderService, TocEntry,
};
