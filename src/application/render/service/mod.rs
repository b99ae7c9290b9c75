mod config;
mod highlight;
mod postprocess;
mod rewrite;
mod widgets;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use syntect::{dumps::from_uncompressed_data, html::ClassStyle, parsing::SyntaxSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::render::types::{RenderError, RenderOutput, RenderRequest, RenderService};
use crate::config::{CommentsSettings, RenderSettings};

use config::{build_sanitizer, default_options};
use postprocess::{ProcessedHtml, post_process};
use rewrite::{COMMENTS_PLACEHOLDER, RewriteContext, RewriteOutcome, rewrite_ast};

pub(crate) const DEFAULT_WORDS_PER_MINUTE: u32 = 225;

/// Third-party comment thread embed (utterances-compatible script).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentsEmbed {
    pub script_url: String,
    pub repo: String,
    pub issue_term: String,
    pub label: Option<String>,
    pub theme: String,
}

impl From<&CommentsSettings> for CommentsEmbed {
    fn from(settings: &CommentsSettings) -> Self {
        Self {
            script_url: settings.script_url.clone(),
            repo: settings.repo.clone(),
            issue_term: settings.issue_term.clone(),
            label: settings.label.clone(),
            theme: settings.theme.clone(),
        }
    }
}

/// Comrak-based rendering pipeline with Syntect highlighting, widget expansion
/// and Ammonia sanitisation.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
    comments: Option<CommentsEmbed>,
    words_per_minute: u32,
}

impl ComrakRenderService {
    /// Construct a renderer from an explicit pipeline configuration.
    pub fn with_config(config: &RenderPipelineConfig) -> Self {
        Self {
            options: default_options(),
            syntax_set: load_syntax_set(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_sanitizer(),
            comments: config.comments.clone(),
            words_per_minute: config.words_per_minute.max(1),
        }
    }

    /// Render markdown into HTML while skipping the sanitisation stage. This is
    /// intended for diagnostics when refining sanitizer rules.
    pub fn render_unsanitized(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);
        let outcome = self.rewrite_stage(root, request)?;
        let html = render_html_stage(root, &self.options)?;
        Ok(self.restore_stage(html, &outcome, &request.slug))
    }

    fn rewrite_stage<'a>(
        &self,
        root: &'a AstNode<'a>,
        request: &RenderRequest,
    ) -> Result<RewriteOutcome, RenderError> {
        let context = RewriteContext {
            syntax_set: &self.syntax_set,
            class_style: &self.class_style,
            options: &self.options,
            slug: &request.slug,
            document_dir: request.document_dir.as_deref(),
            public_path: &request.public_path,
        };
        rewrite_ast(root, &context)
    }

    fn restore_stage(&self, html: String, outcome: &RewriteOutcome, slug: &str) -> String {
        let Some(fragment) = outcome.comments.as_ref() else {
            return html;
        };
        let embed = widgets::comments_html(self.comments.as_ref(), slug, fragment.term.as_deref());
        html.replace(&format!("<div>{COMMENTS_PLACEHOLDER}</div>"), &embed)
    }
}

fn load_syntax_set() -> SyntaxSet {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    match from_uncompressed_data(syntax_bytes) {
        Ok(set) => set,
        Err(err) => {
            warn!(
                target = "quire::render",
                error = %err,
                "bundled syntax pack is unreadable; falling back to syntect defaults"
            );
            SyntaxSet::load_defaults_newlines()
        }
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::with_config(&active_render_config())));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::with_config(&RenderPipelineConfig::default())
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let outcome = self.rewrite_stage(root, request)?;
        let rendered_html = render_html_stage(root, &self.options)?;
        let sanitized_html = self.sanitizer.clean(&rendered_html).to_string();
        let restored_html = self.restore_stage(sanitized_html, &outcome, &request.slug);

        let ProcessedHtml { html, toc, metrics } =
            post_process(&restored_html, &outcome.headings, self.words_per_minute)?;

        debug!(
            target = "quire::render",
            slug = %request.slug,
            words = metrics.word_count,
            references = outcome.references.len(),
            widgets = outcome.widgets.len(),
            "document rendered"
        );

        Ok(RenderOutput {
            html,
            toc,
            references: outcome.references,
            widgets: outcome.widgets,
            contains_code: outcome.contains_code || metrics.code_blocks_count > 0,
            metrics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineConfig {
    pub comments: Option<CommentsEmbed>,
    pub words_per_minute: u32,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            comments: None,
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }
}

impl RenderPipelineConfig {
    pub fn from_settings(render: &RenderSettings, comments: Option<&CommentsSettings>) -> Self {
        Self {
            comments: comments.map(CommentsEmbed::from),
            words_per_minute: render.words_per_minute,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

/// Install the configuration used by [`render_service`]. Must run before the
/// first call to it.
pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
