//! `sitemap.xml` and `robots.txt` generation.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use url::Url;

use crate::{config::SiteSettings, domain::document::Document};

use super::syndication::xml_escape;

/// Generate sitemap.xml content for the home page and every published document.
pub fn sitemap_xml<'a>(site: &SiteSettings, documents: impl IntoIterator<Item = &'a Document>) -> String {
    let documents: Vec<&Document> = documents.into_iter().collect();
    let newest = documents
        .iter()
        .map(|document| document_timestamp(document))
        .max();

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    xml.push_str(&sitemap_entry(&site.base_url, "/", newest));
    for document in documents {
        xml.push_str(&sitemap_entry(
            &site.base_url,
            &document.public_path(),
            Some(document_timestamp(document)),
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Generate robots.txt content pointing crawlers at the sitemap.
pub fn robots_txt(site: &SiteSettings) -> String {
    let sitemap_url = canonical_url(&site.base_url, "/sitemap.xml");
    format!("User-agent: *\nAllow: /\nSitemap: {sitemap_url}\n")
}

/// Absolute URL of a site-relative path.
pub fn canonical_url(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    if path == "/" {
        format!("{base}/")
    } else {
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

pub(crate) fn document_timestamp(document: &Document) -> OffsetDateTime {
    document.front_matter.date.midnight().assume_utc()
}

fn sitemap_entry(base: &Url, path: &str, lastmod: Option<OffsetDateTime>) -> String {
    let loc = xml_escape(&canonical_url(base, path));
    let lastmod_str = lastmod
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_default();
    if lastmod_str.is_empty() {
        format!("  <url><loc>{loc}</loc></url>\n")
    } else {
        format!("  <url><loc>{loc}</loc><lastmod>{lastmod_str}</lastmod></url>\n")
    }
}
