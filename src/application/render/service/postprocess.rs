use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str, text};

use crate::application::render::types::{ContentMetrics, RenderError, TocEntry};
use crate::domain::document::{TargetKind, classify_target};

use super::rewrite::HeadingInfo;

/// Deepest heading level listed in the table of contents.
const TOC_MAX_LEVEL: u8 = 3;

pub(crate) struct ProcessedHtml {
    pub(crate) html: String,
    pub(crate) toc: Vec<TocEntry>,
    pub(crate) metrics: ContentMetrics,
}

pub(crate) fn post_process(
    html: &str,
    headings: &[HeadingInfo],
    words_per_minute: u32,
) -> Result<ProcessedHtml, RenderError> {
    let AugmentOutcome { html, state } = augment_semantics(html)?;
    let metrics = build_content_metrics(&state, words_per_minute);

    Ok(ProcessedHtml {
        html,
        toc: build_toc(headings),
        metrics,
    })
}

fn build_toc(headings: &[HeadingInfo]) -> Vec<TocEntry> {
    headings
        .iter()
        .filter(|heading| (2..=TOC_MAX_LEVEL).contains(&heading.level))
        .map(|heading| TocEntry {
            level: heading.level,
            anchor: heading.slug.clone(),
            text: heading.text.clone(),
        })
        .collect()
}

#[derive(Default, Clone)]
struct AugmentState {
    internal_links: u32,
    external_links: u32,
    images: u32,
    code_blocks: u32,
    word_count: u32,
}

struct AugmentOutcome {
    html: String,
    state: AugmentState,
}

fn augment_semantics(html: &str) -> Result<AugmentOutcome, RenderError> {
    let state = Rc::new(RefCell::new(AugmentState::default()));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("img", {
                    let state = Rc::clone(&state);
                    move |el| {
                        {
                            let mut state = state.borrow_mut();
                            state.images = state.images.saturating_add(1);
                        }
                        if el.get_attribute("alt").is_none() {
                            el.set_attribute("alt", "")?;
                        }
                        if el.get_attribute("loading").is_none() {
                            el.set_attribute("loading", "lazy")?;
                        }
                        if el.get_attribute("decoding").is_none() {
                            el.set_attribute("decoding", "async")?;
                        }
                        Ok(())
                    }
                }),
                element!("a[href]", {
                    let state = Rc::clone(&state);
                    move |el| {
                        let Some(href) = el.get_attribute("href") else {
                            return Ok(());
                        };
                        match classify_link(&href) {
                            LinkKind::External => {
                                {
                                    let mut state = state.borrow_mut();
                                    state.external_links = state.external_links.saturating_add(1);
                                }
                                let rel =
                                    merge_rel(el.get_attribute("rel"), &["noopener", "noreferrer"]);
                                el.set_attribute("rel", &rel)?;
                                el.set_attribute("data-link-kind", "external")?;
                            }
                            LinkKind::Internal => {
                                {
                                    let mut state = state.borrow_mut();
                                    state.internal_links = state.internal_links.saturating_add(1);
                                }
                                el.set_attribute("data-link-kind", "internal")?;
                            }
                            LinkKind::Anchor => el.set_attribute("data-link-kind", "anchor")?,
                            LinkKind::Other => el.set_attribute("data-link-kind", "other")?,
                        }
                        Ok(())
                    }
                }),
                element!("pre", {
                    let state = Rc::clone(&state);
                    move |el| {
                        {
                            let mut state = state.borrow_mut();
                            state.code_blocks = state.code_blocks.saturating_add(1);
                        }
                        if let Some(lang) = el.get_attribute("data-language") {
                            if el.get_attribute("role").is_none() {
                                el.set_attribute("role", "region")?;
                            }
                            let trimmed = lang.trim();
                            if el.get_attribute("aria-label").is_none() && !trimmed.is_empty() {
                                el.set_attribute("aria-label", &format!("Code block in {trimmed}"))?;
                            }
                        }
                        Ok(())
                    }
                }),
                element!("table", |el| {
                    el.set_attribute("data-role", "post-table")?;
                    if el.get_attribute("role").is_none() {
                        el.set_attribute("role", "table")?;
                    }
                    Ok(())
                }),
                element!("th", |el| {
                    if el.get_attribute("scope").is_none() {
                        el.set_attribute("scope", "col")?;
                    }
                    Ok(())
                }),
                element!("blockquote", |el| {
                    el.set_attribute("data-role", "post-quote")?;
                    if el.get_attribute("role").is_none() {
                        el.set_attribute("role", "note")?;
                    }
                    Ok(())
                }),
                text!("*", {
                    let state = Rc::clone(&state);
                    move |t| {
                        let words = t.as_str().split_whitespace().count() as u32;
                        if words > 0 {
                            let mut state = state.borrow_mut();
                            state.word_count = state.word_count.saturating_add(words);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    let state = Rc::try_unwrap(state)
        .map(|cell| cell.into_inner())
        .unwrap_or_else(|rc| rc.borrow().clone());

    Ok(AugmentOutcome {
        html: rewritten,
        state,
    })
}

fn build_content_metrics(state: &AugmentState, words_per_minute: u32) -> ContentMetrics {
    let reading_time_minutes = if state.word_count == 0 {
        0
    } else {
        state.word_count.div_ceil(words_per_minute.max(1)).max(1)
    };

    ContentMetrics {
        word_count: state.word_count,
        reading_time_minutes,
        internal_links_count: state.internal_links,
        external_links_count: state.external_links,
        images_count: state.images,
        code_blocks_count: state.code_blocks,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Internal,
    External,
    Anchor,
    Other,
}

fn classify_link(href: &str) -> LinkKind {
    if href.is_empty() {
        return LinkKind::Anchor;
    }
    match classify_target(href) {
        TargetKind::Anchor => LinkKind::Anchor,
        TargetKind::External if href.starts_with("http://") || href.starts_with("https://") => {
            LinkKind::External
        }
        TargetKind::External => LinkKind::Other,
        TargetKind::SiteAbsolute(_) | TargetKind::Relative(_) => LinkKind::Internal,
    }
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    tokens.extend(required.iter().map(|token| token.to_string()));
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, slug: &str, text: &str) -> HeadingInfo {
        HeadingInfo {
            level,
            slug: slug.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn toc_keeps_levels_two_and_three() {
        let headings = vec![
            heading(1, "title", "Title"),
            heading(2, "setup", "Setup"),
            heading(3, "install", "Install"),
            heading(4, "details", "Details"),
        ];
        let html = "<h1 id=\"title\">Title</h1><h2 id=\"setup\">Setup</h2>";
        let processed = post_process(html, &headings, 225).expect("post process");

        let anchors: Vec<_> = processed.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["setup", "install"]);
        assert!(processed.html.contains("<h2 id=\"setup\">"));
    }

    #[test]
    fn links_are_classified() {
        let html = concat!(
            "<p><a href=\"https://react.dev\">a</a>",
            "<a href=\"/other-post/\">b</a>",
            "<a href=\"#intro\">c</a>",
            "<a href=\"mailto:me@example.com\">d</a></p>"
        );
        let processed = post_process(html, &[], 225).expect("post process");

        assert!(processed.html.contains(
            "href=\"https://react.dev\" rel=\"noopener noreferrer\" data-link-kind=\"external\""
        ));
        assert!(processed.html.contains("data-link-kind=\"internal\""));
        assert!(processed.html.contains("data-link-kind=\"anchor\""));
        assert!(processed.html.contains("data-link-kind=\"other\""));
        assert_eq!(processed.metrics.external_links_count, 1);
        assert_eq!(processed.metrics.internal_links_count, 1);
    }

    #[test]
    fn reading_time_rounds_up() {
        let words = vec!["word"; 451].join(" ");
        let processed = post_process(&format!("<p>{words}</p>"), &[], 225).expect("post process");
        assert_eq!(processed.metrics.word_count, 451);
        assert_eq!(processed.metrics.reading_time_minutes, 3);

        let empty = post_process("<p></p>", &[], 225).expect("post process");
        assert_eq!(empty.metrics.reading_time_minutes, 0);
    }

    #[test]
    fn images_get_loading_hints() {
        let processed =
            post_process("<p><img src=\"/a/x.png\" alt=\"x\"></p>", &[], 225).expect("post process");
        assert!(processed.html.contains("loading=\"lazy\""));
        assert!(processed.html.contains("decoding=\"async\""));
        assert_eq!(processed.metrics.images_count, 1);
    }
}
