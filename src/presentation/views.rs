use askama::{Error as AskamaError, Template};
use thiserror::Error;

use crate::{
    application::{render::RenderOutput, sitemap::canonical_url},
    config::SiteSettings,
    domain::document::Document,
};

#[derive(Debug, Error)]
#[error("{public_message} in {origin}")]
pub struct TemplateRenderError {
    pub(crate) origin: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(origin: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            origin,
            public_message,
            error,
        }
    }
}

pub fn render_template<T: Template>(template: T) -> Result<String, TemplateRenderError> {
    template.render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
    })
}

/// Site-wide values shared by every page.
#[derive(Clone)]
pub struct SiteChrome {
    pub title: String,
    pub description: String,
    pub language: String,
    pub home_href: String,
    pub stylesheet_href: String,
    pub rss_href: String,
    pub atom_href: String,
    pub author: Option<String>,
}

impl SiteChrome {
    pub fn from_settings(site: &SiteSettings) -> Self {
        Self {
            title: site.title.clone(),
            description: site.description.clone(),
            language: site.language.clone(),
            home_href: "/".to_string(),
            stylesheet_href: "/site.css".to_string(),
            rss_href: "/rss.xml".to_string(),
            atom_href: "/atom.xml".to_string(),
            author: site.author.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub og_type: &'static str,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub chrome: SiteChrome,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: SiteChrome, meta: PageMetaView, content: T) -> Self {
        Self {
            chrome,
            meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct TagBadge {
    pub value: String,
    pub label: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub description: Option<String>,
    pub iso_date: String,
    pub published: String,
    pub badges: Vec<TagBadge>,
    pub reading_time_minutes: u32,
}

impl PostCard {
    pub fn new(document: &Document, output: &RenderOutput) -> Self {
        Self {
            href: document.public_path(),
            title: document.front_matter.title.clone(),
            description: document.front_matter.description.clone(),
            iso_date: document.front_matter.iso_date(),
            published: document.front_matter.human_date(),
            badges: build_tag_badges(&document.front_matter.tags),
            reading_time_minutes: output.metrics.reading_time_minutes,
        }
    }
}

pub struct IndexContext {
    pub posts: Vec<PostCard>,
    pub has_results: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

impl IndexTemplate {
    pub fn build(site: &SiteSettings, posts: Vec<PostCard>) -> Self {
        let meta = PageMetaView {
            title: site.title.clone(),
            description: site.description.clone(),
            canonical: canonical_url(&site.base_url, "/"),
            og_type: "website",
        };
        let has_results = !posts.is_empty();
        Self {
            view: LayoutContext::new(
                SiteChrome::from_settings(site),
                meta,
                IndexContext { posts, has_results },
            ),
        }
    }
}

#[derive(Clone)]
pub struct BannerView {
    pub src: String,
    pub alt: String,
}

#[derive(Clone)]
pub struct TocItemView {
    pub anchor: String,
    pub text: String,
    pub level: u8,
}

pub struct PostDetailContext {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub published: String,
    pub iso_date: String,
    pub tags: Vec<TagBadge>,
    pub banner: Option<BannerView>,
    pub reading_time_minutes: u32,
    pub toc: Vec<TocItemView>,
    pub body_html: String,
    pub has_code_blocks: bool,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

impl PostTemplate {
    pub fn build(site: &SiteSettings, document: &Document, output: &RenderOutput) -> Self {
        let front_matter = &document.front_matter;
        let public_path = document.public_path();

        let banner = front_matter.banner.as_deref().map(|banner| BannerView {
            src: asset_href(&public_path, banner),
            alt: front_matter.title.clone(),
        });

        let content = PostDetailContext {
            slug: document.slug.clone(),
            title: front_matter.title.clone(),
            description: front_matter.description.clone(),
            published: front_matter.human_date(),
            iso_date: front_matter.iso_date(),
            tags: build_tag_badges(&front_matter.tags),
            banner,
            reading_time_minutes: output.metrics.reading_time_minutes,
            toc: output
                .toc
                .iter()
                .map(|entry| TocItemView {
                    anchor: entry.anchor.clone(),
                    text: entry.text.clone(),
                    level: entry.level,
                })
                .collect(),
            body_html: output.html.clone(),
            has_code_blocks: output.contains_code,
        };

        let meta = PageMetaView {
            title: format!("{} | {}", front_matter.title, site.title),
            description: front_matter
                .description
                .clone()
                .unwrap_or_else(|| site.description.clone()),
            canonical: canonical_url(&site.base_url, &public_path),
            og_type: "article",
        };

        Self {
            view: LayoutContext::new(SiteChrome::from_settings(site), meta, content),
        }
    }
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the homepage to continue reading.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

impl ErrorTemplate {
    pub fn not_found(site: &SiteSettings) -> Self {
        let content = ErrorPageView::not_found();
        let meta = PageMetaView {
            title: format!("{} | {}", content.title, site.title),
            description: content.message.clone(),
            canonical: canonical_url(&site.base_url, "/404.html"),
            og_type: "website",
        };
        Self {
            view: LayoutContext::new(SiteChrome::from_settings(site), meta, content),
        }
    }
}

/// Public URL of a document-relative asset; absolute references pass through.
fn asset_href(public_path: &str, reference: &str) -> String {
    if reference.starts_with('/') || reference.contains("://") {
        return reference.to_string();
    }
    let relative = reference.trim_start_matches("./");
    format!("{public_path}{relative}")
}

pub fn build_tag_badges(tags: &[String]) -> Vec<TagBadge> {
    tags.iter()
        .map(|tag| TagBadge {
            value: tag.clone(),
            label: format!("#{}", title_case(tag)),
        })
        .collect()
}

pub fn title_case(tag: &str) -> String {
    if tag.eq_ignore_ascii_case("ai") || tag.eq_ignore_ascii_case("css") {
        return tag.to_ascii_uppercase();
    }

    let mut words = Vec::new();
    for segment in tag.split(['-', '_', ' ']) {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            let mut word = String::new();
            word.extend(first.to_uppercase());
            for ch in chars {
                word.extend(ch.to_lowercase());
            }
            words.push(word);
        }
    }

    if words.is_empty() {
        tag.to_string()
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_handles_separators() {
        assert_eq!(title_case("react-hooks"), "React Hooks");
        assert_eq!(title_case("css"), "CSS");
        assert_eq!(title_case("前端"), "前端");
    }

    #[test]
    fn asset_href_rewrites_relative_references() {
        assert_eq!(asset_href("/hooks/", "./banner.jpg"), "/hooks/banner.jpg");
        assert_eq!(asset_href("/hooks/", "img/b.png"), "/hooks/img/b.png");
        assert_eq!(
            asset_href("/hooks/", "https://cdn.example.com/b.png"),
            "https://cdn.example.com/b.png"
        );
    }
}
