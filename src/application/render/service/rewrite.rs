use std::{num::NonZeroU32, path::Path};

use comrak::{
    Arena,
    nodes::{AstNode, NodeHtmlBlock, NodeValue},
    options::Options,
    parse_document,
};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use syntect::html::ClassStyle;
use syntect::parsing::SyntaxSet;
use tracing::{debug, warn};

use crate::{
    application::render::types::{Reference, ReferenceKind, RenderError},
    domain::{
        document::{TargetKind, classify_target, resolve_within},
        slug::AnchorSlugger,
        widgets::{self, Segment, Widget, WidgetKind},
    },
};

use super::{escape_attribute, highlight, render_html_stage, widgets as widget_html};

const MAX_DIMENSION: u32 = 10_000;
const DIMENSION_WIDTH: &str = "width";
const DIMENSION_HEIGHT: &str = "height";
pub(crate) const COMMENTS_PLACEHOLDER: &str = "__QUIRE_COMMENTS_PLACEHOLDER__";
/// Characters escaped when a local asset path becomes a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

#[derive(Debug, Clone)]
pub(crate) struct HeadingInfo {
    pub(crate) level: u8,
    pub(crate) slug: String,
    pub(crate) text: String,
}

/// Comments widget found in the body; restored after sanitisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommentsFragment {
    pub(crate) term: Option<String>,
}

#[derive(Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) contains_code: bool,
    pub(crate) headings: Vec<HeadingInfo>,
    pub(crate) references: Vec<Reference>,
    pub(crate) widgets: Vec<WidgetKind>,
    pub(crate) comments: Option<CommentsFragment>,
}

/// Inputs the walker needs besides the AST itself.
pub(crate) struct RewriteContext<'a> {
    pub(crate) syntax_set: &'a SyntaxSet,
    pub(crate) class_style: &'a ClassStyle,
    pub(crate) options: &'a Options<'static>,
    pub(crate) slug: &'a str,
    pub(crate) document_dir: Option<&'a Path>,
    pub(crate) public_path: &'a str,
}

pub(crate) fn rewrite_ast<'n>(
    root: &'n AstNode<'n>,
    context: &RewriteContext<'_>,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker::new(context);
    walker.visit_nodes(root)?;
    walker.finish()
}

struct RewriteWalker<'a> {
    context: &'a RewriteContext<'a>,
    outcome: RewriteOutcome,
    slugger: AnchorSlugger,
    /// Lines of currently open `<Callout>` tags.
    open_callouts: Vec<usize>,
    /// Added to source positions while walking a body nested in a raw block.
    line_offset: usize,
}

impl<'a> RewriteWalker<'a> {
    fn new(context: &'a RewriteContext<'a>) -> Self {
        Self {
            context,
            outcome: RewriteOutcome::default(),
            slugger: AnchorSlugger::new(),
            open_callouts: Vec::new(),
            line_offset: 0,
        }
    }

    fn finish(self) -> Result<RewriteOutcome, RenderError> {
        if let Some(&line) = self.open_callouts.last() {
            return Err(RenderError::WidgetPlacement {
                widget: WidgetKind::Callout,
                line,
                message: "opened here but never closed with `</Callout>`".to_string(),
            });
        }
        Ok(self.outcome)
    }

    fn visit_nodes<'n>(&mut self, node: &'n AstNode<'n>) -> Result<(), RenderError> {
        let line = node.data.borrow().sourcepos.start.line + self.line_offset;

        if {
            let data = node.data.borrow();
            matches!(data.value, NodeValue::Image(_))
        } {
            self.process_image_node(node, line)?;
        }

        if let Some(target) = link_target(node) {
            self.outcome.references.push(Reference {
                kind: ReferenceKind::Link,
                target,
                line,
                missing_alt: false,
            });
        }

        if let Some(level) = heading_level(node) {
            let heading = self.heading_info(node, level, line)?;
            self.visit_children(node)?;
            render_heading(node, &heading, self.context.options)?;
            self.outcome.headings.push(heading);
            return Ok(());
        }

        if let Some((info, literal)) = extract_code_block(node) {
            let fence = highlight::FenceInfo::parse(&info);
            let html = highlight::highlight_code(
                &fence,
                &literal,
                self.context.syntax_set,
                self.context.class_style,
            )?;
            self.outcome.contains_code = true;
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        } else if let Some((literal, inline)) = extract_raw_html(node)
            && widgets::contains_widget(&literal)
        {
            let html = self.expand_widgets(&literal, inline, line)?;
            let mut data = node.data.borrow_mut();
            data.value = if inline {
                NodeValue::HtmlInline(html)
            } else {
                NodeValue::HtmlBlock(NodeHtmlBlock {
                    block_type: 0,
                    literal: html,
                })
            };
        }

        self.visit_children(node)
    }

    fn visit_children<'n>(&mut self, node: &'n AstNode<'n>) -> Result<(), RenderError> {
        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next)?;
            child = next.next_sibling();
        }
        Ok(())
    }

    fn heading_info(
        &mut self,
        node: &AstNode<'_>,
        level: u8,
        line: usize,
    ) -> Result<HeadingInfo, RenderError> {
        let text = collect_inline_text(node);
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let slug = match self.slugger.anchor_for(&normalized) {
            Ok(slug) => slug,
            Err(err) => {
                debug!(
                    target = "quire::render::anchors",
                    slug = self.context.slug,
                    line,
                    "heading has no sluggable text ({err}); using fallback anchor"
                );
                self.slugger
                    .anchor_for("section")
                    .map_err(|err| RenderError::Document {
                        message: err.to_string(),
                    })?
            }
        };
        Ok(HeadingInfo {
            level,
            slug,
            text: normalized,
        })
    }

    /// Markdown nested directly inside a raw block never reaches the main
    /// parser. It is parsed on its own and walked like the rest of the body so
    /// its references, headings and code blocks are collected too.
    fn render_nested(&mut self, markdown: &str, first_line: usize) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, self.context.options);

        let outer_offset = std::mem::replace(&mut self.line_offset, first_line.saturating_sub(1));
        let walked = self.visit_nodes(root);
        self.line_offset = outer_offset;
        walked?;

        render_html_stage(root, self.context.options)
    }

    fn expand_widgets(
        &mut self,
        literal: &str,
        inline: bool,
        line: usize,
    ) -> Result<String, RenderError> {
        let segments =
            widgets::scan(literal).map_err(|source| RenderError::Widget { line, source })?;

        let mut html = String::with_capacity(literal.len() + 64);
        // Line of the next segment; widgets carry no span, so it advances
        // only past text segments.
        let mut segment_line = line;
        for segment in segments {
            match segment {
                Segment::Text(text) if inline => html.push_str(text),
                Segment::Text(text) => {
                    segment_line = line + newlines_before(literal, text);
                    if !text.trim().is_empty() {
                        html.push_str(&self.render_nested(text, segment_line)?);
                    }
                    segment_line += text.matches('\n').count();
                }
                Segment::Widget(widget) => {
                    self.outcome.widgets.push(widget.kind());
                    self.track_callouts(&widget, segment_line)?;
                    match widget {
                        Widget::Comments { term } => {
                            html.push_str(&self.place_comments(term, inline, segment_line)?);
                        }
                        other => {
                            if let Some(fragment) = widget_html::inline_safe_html(&other, inline) {
                                html.push_str(&fragment);
                            }
                        }
                    }
                }
            }
        }

        Ok(html)
    }

    fn track_callouts(&mut self, widget: &Widget, line: usize) -> Result<(), RenderError> {
        match widget {
            Widget::CalloutOpen { .. } => {
                self.open_callouts.push(line);
                Ok(())
            }
            Widget::CalloutClose => {
                if self.open_callouts.pop().is_none() {
                    return Err(RenderError::WidgetPlacement {
                        widget: WidgetKind::Callout,
                        line,
                        message: "`</Callout>` has no matching opening tag".to_string(),
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn place_comments(
        &mut self,
        term: Option<String>,
        inline: bool,
        line: usize,
    ) -> Result<String, RenderError> {
        if inline {
            return Err(RenderError::WidgetPlacement {
                widget: WidgetKind::Comments,
                line,
                message: "must stand on its own line".to_string(),
            });
        }
        if self.outcome.comments.is_some() {
            return Err(RenderError::WidgetPlacement {
                widget: WidgetKind::Comments,
                line,
                message: "a document can embed only one comments thread".to_string(),
            });
        }

        self.outcome.comments = Some(CommentsFragment { term });
        Ok(format!("<div>{COMMENTS_PLACEHOLDER}</div>"))
    }

    fn process_image_node(&mut self, node: &AstNode<'_>, line: usize) -> Result<(), RenderError> {
        let (src, title) = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Image(link) => (link.url.clone(), link.title.clone()),
                _ => return Ok(()),
            }
        };

        let alt_raw = collect_inline_text(node);
        let alt = alt_raw.split_whitespace().collect::<Vec<_>>().join(" ");

        self.outcome.references.push(Reference {
            kind: ReferenceKind::Image,
            target: src.clone(),
            line,
            missing_alt: alt.trim().is_empty(),
        });

        let local = match classify_target(&src) {
            TargetKind::Relative(path) => resolve_within(Path::new(""), path),
            _ => None,
        };

        let mut dimensions = extract_markdown_dimensions(node);
        if dimensions.is_none()
            && let (Some(relative), Some(dir)) = (local.as_ref(), self.context.document_dir)
        {
            dimensions = read_image_dimensions(&dir.join(relative), self.context.slug);
        }

        let public_src = match local.as_ref() {
            Some(relative) => format!(
                "{}{}",
                self.context.public_path,
                relative
                    .components()
                    .map(|component| {
                        utf8_percent_encode(&component.as_os_str().to_string_lossy(), PATH_SEGMENT)
                            .to_string()
                    })
                    .collect::<Vec<_>>()
                    .join("/")
            ),
            None => src.clone(),
        };

        let html = build_image_html(
            &public_src,
            alt.trim(),
            (!title.is_empty()).then_some(title.as_str()),
            dimensions,
        );

        {
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlInline(html);
        }

        while let Some(child) = node.first_child() {
            child.detach();
        }

        Ok(())
    }
}

/// Number of line breaks in `outer` ahead of `inner`, a subslice of it.
fn newlines_before(outer: &str, inner: &str) -> usize {
    let start = (inner.as_ptr() as usize).saturating_sub(outer.as_ptr() as usize);
    outer
        .get(..start)
        .map_or(0, |prefix| prefix.matches('\n').count())
}

/// Replace a walked heading with its rendered HTML carrying the anchor id.
/// Raw HTML headings never pass through here and keep their markup.
fn render_heading<'n>(
    node: &'n AstNode<'n>,
    heading: &HeadingInfo,
    options: &Options<'static>,
) -> Result<(), RenderError> {
    let html = render_html_stage(node, options)?;
    let open = format!("<h{}", heading.level);
    let html = html.replacen(
        &open,
        &format!("{open} id=\"{}\"", escape_attribute(&heading.slug)),
        1,
    );

    while let Some(child) = node.first_child() {
        child.detach();
    }
    node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
        block_type: 0,
        literal: html,
    });
    Ok(())
}

fn read_image_dimensions(path: &Path, slug: &str) -> Option<(NonZeroU32, NonZeroU32)> {
    match imagesize::size(path) {
        Ok(size) => {
            let width = u32::try_from(size.width).ok().and_then(NonZeroU32::new)?;
            let height = u32::try_from(size.height).ok().and_then(NonZeroU32::new)?;
            Some((width, height))
        }
        Err(err) => {
            // Missing files are reported by the linter; anything else is worth a note.
            if path.exists() {
                warn!(
                    target = "quire::render::images",
                    slug,
                    path = %path.display(),
                    "failed to read image dimensions: {err}"
                );
            }
            None
        }
    }
}

fn build_image_html(
    src: &str,
    alt: &str,
    title: Option<&str>,
    dimensions: Option<(NonZeroU32, NonZeroU32)>,
) -> String {
    let mut html = String::with_capacity(src.len() + alt.len() + 64);
    html.push_str("<img data-role=\"post-image\"");
    html.push_str(" src=\"");
    html.push_str(&escape_attribute(src));
    html.push('"');

    html.push_str(" alt=\"");
    html.push_str(&escape_attribute(alt));
    html.push('"');

    if let Some(title) = title.and_then(|t| (!t.is_empty()).then_some(t)) {
        html.push_str(" title=\"");
        html.push_str(&escape_attribute(title));
        html.push('"');
    }

    if let Some((width, height)) = dimensions {
        html.push_str(&format!(" width=\"{width}\" height=\"{height}\""));
    }

    html.push_str(" />");
    html
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

/// `![alt](src){width=640 height=480}` explicit sizing; the braces block is
/// removed from the tree when recognised.
fn extract_markdown_dimensions(node: &AstNode<'_>) -> Option<(NonZeroU32, NonZeroU32)> {
    let sibling = node.next_sibling()?;
    let dimensions = {
        let data = sibling.data.borrow();
        match &data.value {
            NodeValue::Text(text) => {
                let trimmed = text.trim_start();
                let end = trimmed.find('}')?;
                parse_dimension_block(&trimmed[..=end]).map(|dims| (dims, trimmed[end + 1..].to_string()))
            }
            _ => None,
        }
    };

    let (dims, remainder) = dimensions?;
    if remainder.is_empty() {
        sibling.detach();
    } else {
        let mut data = sibling.data.borrow_mut();
        data.value = NodeValue::Text(remainder.into());
    }
    Some(dims)
}

fn parse_dimension_block(value: &str) -> Option<(NonZeroU32, NonZeroU32)> {
    let inner = value.strip_prefix('{')?.strip_suffix('}')?.trim();
    let inner = inner.strip_prefix(':').unwrap_or(inner).trim_start();

    let mut width: Option<NonZeroU32> = None;
    let mut height: Option<NonZeroU32> = None;

    for token in inner.split_whitespace() {
        if let Some((key, raw)) = token.split_once('=') {
            let raw = raw.trim_matches('"');
            match key.trim() {
                DIMENSION_WIDTH => width = parse_dimension_value(raw),
                DIMENSION_HEIGHT => height = parse_dimension_value(raw),
                _ => {}
            }
        }
    }

    width.zip(height)
}

fn parse_dimension_value(raw: &str) -> Option<NonZeroU32> {
    if raw.is_empty() || !raw.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let value: u32 = raw.parse().ok()?;
    if value > MAX_DIMENSION {
        return None;
    }

    NonZeroU32::new(value)
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

/// Raw HTML literal of a node, with `true` for inline HTML.
fn extract_raw_html(node: &AstNode<'_>) -> Option<(String, bool)> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::HtmlBlock(block) => Some((block.literal.clone(), false)),
        NodeValue::HtmlInline(literal) => Some((literal.to_string(), true)),
        _ => None,
    }
}

fn link_target(node: &AstNode<'_>) -> Option<String> {
    let data = node.data.borrow();
    if let NodeValue::Link(link) = &data.value {
        Some(link.url.to_string())
    } else {
        None
    }
}

fn heading_level(node: &AstNode<'_>) -> Option<u8> {
    let data = node.data.borrow();
    if let NodeValue::Heading(heading) = &data.value {
        Some(heading.level)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comrak::{Arena, format_html, parse_document};

    fn render(markdown: &str) -> Result<(RewriteOutcome, String), RenderError> {
        let options = super::super::config::default_options();
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let class_style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
        let context = RewriteContext {
            syntax_set: &syntax_set,
            class_style: &class_style,
            options: &options,
            slug: "test-post",
            document_dir: None,
            public_path: "/test-post/",
        };

        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let outcome = rewrite_ast(root, &context)?;
        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        Ok((outcome, html))
    }

    #[test]
    fn code_blocks_are_highlighted() {
        let (outcome, html) = render("```ts\nconst a: number = 1;\n```\n").expect("render");
        assert!(outcome.contains_code);
        assert!(html.contains("syntax-highlight"));
        assert!(html.contains("data-language=\"ts\""));
    }

    #[test]
    fn headings_receive_unique_anchors() {
        let (outcome, html) =
            render("## Setup\n\ntext\n\n## Setup\n\n### ---\n\n## Setup 2\n").expect("render");
        let slugs: Vec<_> = outcome.headings.iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, vec!["setup", "setup-2", "section", "setup-2-2"]);
        assert_eq!(outcome.headings[2].level, 3);
        assert!(html.contains("<h2 id=\"setup-2\">Setup</h2>"));
        assert!(html.contains("<h2 id=\"setup-2-2\">Setup 2</h2>"));
    }

    #[test]
    fn raw_html_headings_are_left_without_anchors() {
        let (outcome, html) = render("<h3>Raw</h3>\n\n## Real\n").expect("render");
        assert_eq!(outcome.headings.len(), 1);
        assert!(html.contains("<h3>Raw</h3>"));
        assert!(html.contains("<h2 id=\"real\">Real</h2>"));
    }

    #[test]
    fn headings_inside_callout_blocks_get_their_own_anchors() {
        let (outcome, html) =
            render("<Callout>\n## Inside\n</Callout>\n\n## After\n").expect("render");
        let slugs: Vec<_> = outcome.headings.iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, vec!["inside", "after"]);
        assert!(html.contains("<h2 id=\"inside\">Inside</h2>"));
        assert!(html.contains("<h2 id=\"after\">After</h2>"));
    }

    #[test]
    fn callout_body_in_one_block_is_walked() {
        let (outcome, html) = render(
            "Intro.\n\n<Callout type=\"tip\">\nSee ![chart](missing.png) and [next](/nowhere/).\n</Callout>\n",
        )
        .expect("render");

        let references: Vec<_> = outcome
            .references
            .iter()
            .map(|r| (r.kind, r.target.as_str(), r.line))
            .collect();
        assert_eq!(
            references,
            vec![
                (ReferenceKind::Image, "missing.png", 4),
                (ReferenceKind::Link, "/nowhere/", 4),
            ]
        );
        assert!(html.contains("src=\"/test-post/missing.png\""));
        assert!(html.contains("data-variant=\"tip\""));
    }

    #[test]
    fn images_are_localised_and_recorded() {
        let (outcome, html) =
            render("![Diagram of the store](./images/store.png)\n\n![](https://cdn.example.com/x.png)\n")
                .expect("render");

        assert!(html.contains("src=\"/test-post/images/store.png\""));
        assert!(html.contains("alt=\"Diagram of the store\""));
        assert!(html.contains("src=\"https://cdn.example.com/x.png\""));

        let images: Vec<_> = outcome
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Image)
            .collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].target, "./images/store.png");
        assert_eq!(images[0].line, 1);
        assert!(!images[0].missing_alt);
        assert!(images[1].missing_alt);
    }

    #[test]
    fn encoded_image_paths_stay_encoded() {
        let (outcome, html) = render("![Team](./my%20photo.png)\n").expect("render");
        assert!(html.contains("src=\"/test-post/my%20photo.png\""));
        assert_eq!(outcome.references[0].target, "./my%20photo.png");
    }

    #[test]
    fn explicit_dimensions_are_applied() {
        let (_, html) = render("![chart](chart.png){width=640 height=480}\n").expect("render");
        assert!(html.contains("width=\"640\" height=\"480\""));
        assert!(!html.contains("{width"));
    }

    #[test]
    fn links_are_recorded_with_lines() {
        let (outcome, _) =
            render("Intro\n\nSee [part two](/state-part-2/) and [docs](https://react.dev).\n")
                .expect("render");
        let links: Vec<_> = outcome
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Link)
            .map(|r| (r.target.as_str(), r.line))
            .collect();
        assert_eq!(links, vec![("/state-part-2/", 3), ("https://react.dev", 3)]);
    }

    #[test]
    fn callout_blocks_wrap_markdown() {
        let (outcome, html) =
            render("<Callout type=\"tip\">\n\nPrefer `unknown` over `any`.\n\n</Callout>\n")
                .expect("render");
        assert_eq!(
            outcome.widgets,
            vec![WidgetKind::Callout, WidgetKind::Callout]
        );
        assert!(html.contains("<aside class=\"callout callout-tip\""));
        assert!(html.contains("<code>unknown</code>"));
        assert!(html.contains("</aside>"));
    }

    #[test]
    fn callout_body_inside_one_block_is_rendered() {
        let (_, html) =
            render("<Callout type=\"warning\">\nThis **breaks** things.\n</Callout>\n")
                .expect("render");
        assert!(html.contains("<strong>breaks</strong>"));
        assert!(html.contains("data-variant=\"warning\""));
    }

    #[test]
    fn unclosed_and_stray_callouts_fail() {
        let unclosed = render("<Callout>\n\ntext\n").err().expect("unclosed");
        assert_eq!(unclosed.line(), Some(1));

        let stray = render("text\n\n</Callout>\n").err().expect("stray");
        assert_eq!(stray.line(), Some(3));
    }

    #[test]
    fn comments_become_a_single_placeholder() {
        let (outcome, html) = render("Thanks for reading.\n\n<Comments />\n").expect("render");
        assert_eq!(outcome.comments, Some(CommentsFragment { term: None }));
        assert!(html.contains(COMMENTS_PLACEHOLDER));

        let twice = render("<Comments />\n\n<Comments />\n").err().expect("duplicate");
        assert!(matches!(twice, RenderError::WidgetPlacement { .. }));
    }

    #[test]
    fn inline_attribution_is_expanded() {
        let (outcome, html) = render(
            "Cover photo <Attribution name=\"Jane\" url=\"https://unsplash.com/@jane\" /> thanks.\n",
        )
        .expect("render");
        assert_eq!(outcome.widgets, vec![WidgetKind::Attribution]);
        assert!(html.contains("<span class=\"attribution\""));
        assert!(html.contains("href=\"https://unsplash.com/@jane\""));
    }

    #[test]
    fn unknown_widget_fails_with_line() {
        let err = render("# Title\n\n<Newsletter />\n").err().expect("unknown");
        assert!(matches!(err, RenderError::Widget { line: 3, .. }));
    }

    #[test]
    fn plain_html_is_left_alone() {
        let (outcome, html) = render("<div class=\"note\">hi</div>\n").expect("render");
        assert!(outcome.widgets.is_empty());
        assert!(html.contains("<div class=\"note\">hi</div>"));
    }
}
