//! HTML produced for each widget.
//!
//! Everything here except the comments embed must survive sanitisation. The
//! embed carries a third-party `<script>` and is therefore spliced in via a
//! placeholder after the sanitizer has run.

use crate::domain::widgets::{CalloutVariant, Widget};

use super::{CommentsEmbed, escape_attribute};

pub(crate) fn attribution_html(
    name: &str,
    url: &str,
    source: Option<&str>,
    inline: bool,
) -> String {
    let tag = if inline { "span" } else { "p" };
    let mut html = format!(
        "<{tag} class=\"attribution\" data-widget=\"attribution\">Photo by <a href=\"{}\">{}</a>",
        escape_attribute(url),
        ammonia::clean_text(name)
    );
    if let Some(source) = source {
        html.push_str(" on ");
        html.push_str(&ammonia::clean_text(source));
    }
    html.push_str("</");
    html.push_str(tag);
    html.push('>');
    html
}

pub(crate) fn callout_open_html(variant: CalloutVariant, title: Option<&str>) -> String {
    let heading = title.unwrap_or(variant.label());
    format!(
        "<aside class=\"callout callout-{variant}\" data-widget=\"callout\" data-variant=\"{variant}\" role=\"note\"><p class=\"callout-title\">{}</p>",
        ammonia::clean_text(heading),
        variant = variant.as_str(),
    )
}

pub(crate) const CALLOUT_CLOSE_HTML: &str = "</aside>";

/// Final markup for a comments thread.
pub(crate) fn comments_html(embed: Option<&CommentsEmbed>, slug: &str, term: Option<&str>) -> String {
    let Some(embed) = embed else {
        return format!(
            "<section class=\"comments\" data-widget=\"comments\" data-thread=\"{}\" data-comments=\"disabled\"></section>",
            escape_attribute(slug)
        );
    };

    let issue_term = term.unwrap_or(embed.issue_term.as_str());
    let mut html = format!(
        "<section class=\"comments\" data-widget=\"comments\" data-thread=\"{}\" aria-label=\"Comments\">",
        escape_attribute(slug)
    );
    html.push_str(&format!(
        "<script src=\"{}\" repo=\"{}\" issue-term=\"{}\"",
        escape_attribute(&embed.script_url),
        escape_attribute(&embed.repo),
        escape_attribute(issue_term),
    ));
    if let Some(label) = embed.label.as_deref() {
        html.push_str(&format!(" label=\"{}\"", escape_attribute(label)));
    }
    html.push_str(&format!(
        " theme=\"{}\" crossorigin=\"anonymous\" async></script></section>",
        escape_attribute(&embed.theme)
    ));
    html
}

/// Sanitiser-safe HTML for widgets that need no placeholder.
pub(crate) fn inline_safe_html(widget: &Widget, inline: bool) -> Option<String> {
    match widget {
        Widget::Attribution { name, url, source } => {
            Some(attribution_html(name, url, source.as_deref(), inline))
        }
        Widget::CalloutOpen { variant, title } => {
            Some(callout_open_html(*variant, title.as_deref()))
        }
        Widget::CalloutClose => Some(CALLOUT_CLOSE_HTML.to_string()),
        Widget::Comments { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed() -> CommentsEmbed {
        CommentsEmbed {
            script_url: "https://utteranc.es/client.js".to_string(),
            repo: "owner/blog-comments".to_string(),
            issue_term: "pathname".to_string(),
            label: Some("comments".to_string()),
            theme: "github-light".to_string(),
        }
    }

    #[test]
    fn attribution_escapes_name() {
        let html = attribution_html("A <b>", "https://example.com/?a=1&b=2", Some("Unsplash"), false);
        assert!(html.starts_with("<p class=\"attribution\""));
        assert!(html.contains("href=\"https://example.com/?a=1&amp;b=2\""));
        assert!(html.contains("A&#32;&lt;b&gt;"));
        assert!(html.ends_with("Unsplash</p>"));
    }

    #[test]
    fn callout_uses_variant_label_without_title() {
        let html = callout_open_html(CalloutVariant::Warning, None);
        assert!(html.contains("data-variant=\"warning\""));
        assert!(html.contains("<p class=\"callout-title\">Warning</p>"));
    }

    #[test]
    fn comments_embed_honours_term_override() {
        let html = comments_html(Some(&embed()), "hooks", Some("hooks-migration"));
        assert!(html.contains("repo=\"owner/blog-comments\""));
        assert!(html.contains("issue-term=\"hooks-migration\""));
        assert!(html.contains("label=\"comments\""));
        assert!(html.ends_with("</script></section>"));
    }

    #[test]
    fn comments_without_embed_render_disabled_section() {
        let html = comments_html(None, "hooks", None);
        assert!(html.contains("data-comments=\"disabled\""));
        assert!(!html.contains("<script"));
    }
}
