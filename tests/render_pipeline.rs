use std::path::PathBuf;

use quire::{
    application::{
        lint::{CorpusInput, LintOptions, LintedDocument, lint_corpus},
        render::{
            CommentsEmbed, ComrakRenderService, Reference, ReferenceKind, RenderPipelineConfig,
            RenderRequest, RenderService,
        },
        sitemap::{robots_txt, sitemap_xml},
    },
    config::SiteSettings,
    domain::{
        document::{Document, FrontMatter},
        widgets::WidgetKind,
    },
};
use time::macros::date;
use url::Url;

const ARTICLE: &str = include_str!("fixtures/widgets_article.md");

fn site() -> SiteSettings {
    SiteSettings {
        title: "Field Notes".to_string(),
        description: "Essays on UI engineering".to_string(),
        base_url: Url::parse("https://blog.example.com/").expect("url"),
        language: "en".to_string(),
        author: None,
    }
}

fn document(slug: &str, description: Option<&str>, date: time::Date) -> Document {
    Document {
        slug: slug.to_string(),
        source_path: PathBuf::from(format!("content/{slug}.md")),
        directory: PathBuf::from("content"),
        front_matter: FrontMatter::new(slug, date, description, None, &[]).expect("front matter"),
        body: String::new(),
        body_line_offset: 4,
    }
}

fn reference(kind: ReferenceKind, target: &str, line: usize, missing_alt: bool) -> Reference {
    Reference {
        kind,
        target: target.to_string(),
        line,
        missing_alt,
    }
}

#[test]
fn fixture_renders_every_widget() {
    let renderer = ComrakRenderService::default();
    let output = renderer
        .render(&RenderRequest::new("widgets-fixture", ARTICLE))
        .expect("render succeeds");

    assert_eq!(
        output.widgets,
        vec![
            WidgetKind::Attribution,
            WidgetKind::Callout,
            WidgetKind::Callout,
            WidgetKind::Comments,
        ]
    );
    assert!(output.html.contains("data-widget=\"attribution\""));
    assert!(output.html.contains("Photo by"));
    assert!(output.html.contains("callout-warning"));
    assert!(output.html.contains("data-comments=\"disabled\""));
    assert!(output.contains_code);

    let anchors: Vec<_> = output.toc.iter().map(|entry| entry.anchor.as_str()).collect();
    assert_eq!(anchors, vec!["why-hooks", "migrating-state", "wrapping-up"]);
}

#[test]
fn rendering_is_deterministic() {
    let renderer = ComrakRenderService::default();
    let request = RenderRequest::new("widgets-fixture", ARTICLE);
    let first = renderer.render(&request).expect("first render");
    let second = renderer.render(&request).expect("second render");
    assert_eq!(first, second);
}

#[test]
fn configured_comments_embed_survives_sanitisation() {
    let renderer = ComrakRenderService::with_config(&RenderPipelineConfig {
        comments: Some(CommentsEmbed {
            script_url: "https://utteranc.es/client.js".to_string(),
            repo: "owner/blog-comments".to_string(),
            issue_term: "pathname".to_string(),
            label: None,
            theme: "github-light".to_string(),
        }),
        ..RenderPipelineConfig::default()
    });
    let output = renderer
        .render(&RenderRequest::new("widgets-fixture", ARTICLE))
        .expect("render succeeds");

    assert!(output.html.contains("<script src=\"https://utteranc.es/client.js\""));
    assert!(output.html.contains("repo=\"owner/blog-comments\""));
    assert!(!output.html.contains("__QUIRE_COMMENTS_PLACEHOLDER__"));
}

#[test]
fn robots_points_at_sitemap() {
    insta::assert_snapshot!(robots_txt(&site()).trim_end(), @r"
    User-agent: *
    Allow: /
    Sitemap: https://blog.example.com/sitemap.xml
    ");
}

#[test]
fn sitemap_lists_home_and_documents() {
    let documents = [
        document("typing-reducers", None, date!(2021 - 03 - 04)),
        document("hooks-migration", None, date!(2019 - 02 - 06)),
    ];
    insta::assert_snapshot!(sitemap_xml(&site(), &documents).trim_end(), @r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
      <url><loc>https://blog.example.com/</loc><lastmod>2021-03-04T00:00:00Z</lastmod></url>
      <url><loc>https://blog.example.com/typing-reducers/</loc><lastmod>2021-03-04T00:00:00Z</lastmod></url>
      <url><loc>https://blog.example.com/hooks-migration/</loc><lastmod>2019-02-06T00:00:00Z</lastmod></url>
    </urlset>
    "#);
}

#[test]
fn lint_report_lists_diagnostics_in_path_order() {
    let alpha = document("alpha", None, date!(2020 - 01 - 01));
    let beta = document("beta", Some("Has one"), date!(2020 - 02 - 01));
    let alpha_refs = [
        reference(ReferenceKind::Link, "/beta/", 2, false),
        reference(ReferenceKind::Link, "/gamma/", 3, false),
    ];
    let beta_refs = [reference(
        ReferenceKind::Image,
        "https://cdn.example.com/x.png",
        1,
        true,
    )];

    let report = lint_corpus(&CorpusInput {
        documents: vec![
            LintedDocument {
                document: &beta,
                references: &beta_refs,
            },
            LintedDocument {
                document: &alpha,
                references: &alpha_refs,
            },
        ],
        failures: Vec::new(),
        options: LintOptions::default(),
    });

    insta::assert_snapshot!(report.to_string(), @r"
    warning: content/alpha.md: front matter has no `description`
    error: content/alpha.md:7: link `/gamma/` does not match any post
    warning: content/beta.md:5: image `https://cdn.example.com/x.png` has no alt text
    1 error(s), 2 warning(s)
    ");
}
