//! RSS 2.0 and Atom 1.0 feeds.
//!
//! Both feeds are derived from the published documents in listing order
//! (newest first) and the configured site metadata. Output is deterministic:
//! timestamps come from document dates, never from the clock.

use time::{
    OffsetDateTime,
    format_description::well_known::{Rfc2822, Rfc3339},
};

use crate::{config::SiteSettings, domain::document::Document};

use super::sitemap::{canonical_url, document_timestamp};

/// Maximum number of documents listed in a feed.
pub const FEED_ITEM_LIMIT: usize = 100;

/// Generate RSS 2.0 feed XML.
pub fn rss_feed<'a>(site: &SiteSettings, documents: impl IntoIterator<Item = &'a Document>) -> String {
    let home = canonical_url(&site.base_url, "/");
    let self_link = canonical_url(&site.base_url, "/rss.xml");

    let mut items = String::new();
    for document in documents.into_iter().take(FEED_ITEM_LIMIT) {
        let published = document_timestamp(document);
        let pub_date = published
            .format(&Rfc2822)
            .unwrap_or_else(|_| published.to_string());
        let link = canonical_url(&site.base_url, &document.public_path());
        items.push_str(&format!(
            "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid isPermaLink=\"true\">{}</guid>\n      <pubDate>{}</pubDate>\n",
            xml_escape(&document.front_matter.title),
            xml_escape(&link),
            xml_escape(&link),
            pub_date,
        ));
        if let Some(description) = document.front_matter.description.as_deref() {
            items.push_str(&format!(
                "      <description>{}</description>\n",
                xml_escape(description)
            ));
        }
        for tag in &document.front_matter.tags {
            items.push_str(&format!("      <category>{}</category>\n", xml_escape(tag)));
        }
        items.push_str("    </item>\n");
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n    <language>{}</language>\n    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n{}  </channel>\n</rss>\n",
        xml_escape(&site.title),
        xml_escape(&home),
        xml_escape(&site.description),
        xml_escape(&site.language),
        xml_escape(&self_link),
        items
    )
}

/// Generate Atom 1.0 feed XML.
pub fn atom_feed<'a>(site: &SiteSettings, documents: impl IntoIterator<Item = &'a Document>) -> String {
    let documents: Vec<&Document> = documents.into_iter().take(FEED_ITEM_LIMIT).collect();
    let home = canonical_url(&site.base_url, "/");
    let self_link = canonical_url(&site.base_url, "/atom.xml");

    let updated_at = documents
        .iter()
        .map(|document| document_timestamp(document))
        .max()
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let updated = updated_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| updated_at.to_string());

    let mut entries = String::new();
    for document in documents {
        let published = document_timestamp(document);
        let published_str = published
            .format(&Rfc3339)
            .unwrap_or_else(|_| published.to_string());
        let link = xml_escape(&canonical_url(&site.base_url, &document.public_path()));
        entries.push_str(&format!(
            "  <entry>\n    <title>{}</title>\n    <link href=\"{link}\"/>\n    <id>{link}</id>\n    <published>{published_str}</published>\n    <updated>{published_str}</updated>\n",
            xml_escape(&document.front_matter.title),
        ));
        if let Some(description) = document.front_matter.description.as_deref() {
            entries.push_str(&format!(
                "    <summary>{}</summary>\n",
                xml_escape(description)
            ));
        }
        for tag in &document.front_matter.tags {
            entries.push_str(&format!("    <category term=\"{}\"/>\n", xml_escape(tag)));
        }
        entries.push_str("  </entry>\n");
    }

    let author = site
        .author
        .as_deref()
        .map(|name| format!("  <author><name>{}</name></author>\n", xml_escape(name)))
        .unwrap_or_default();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\">\n  <title>{}</title>\n  <subtitle>{}</subtitle>\n  <id>{}</id>\n  <updated>{}</updated>\n  <link href=\"{}\"/>\n  <link href=\"{}\" rel=\"self\"/>\n{}{}</feed>\n",
        xml_escape(&site.title),
        xml_escape(&site.description),
        xml_escape(&home),
        updated,
        xml_escape(&home),
        xml_escape(&self_link),
        author,
        entries
    )
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    use time::{Date, Month};
    use url::Url;

    use crate::domain::document::FrontMatter;

    pub(crate) fn site() -> SiteSettings {
        SiteSettings {
            title: "Field Notes".to_string(),
            description: "Essays on UI engineering".to_string(),
            base_url: Url::parse("https://blog.example.com/").expect("url"),
            language: "en".to_string(),
            author: Some("Sam Rivera".to_string()),
        }
    }

    pub(crate) fn document(slug: &str, year: i32, month: u8) -> Document {
        let month = Month::try_from(month).expect("month");
        let date = Date::from_calendar_date(year, month, 1).expect("date");
        let front_matter = FrontMatter::new(
            &format!("Post {slug}"),
            date,
            Some("Why <this> & that"),
            None,
            &["react".to_string()],
        )
        .expect("front matter");
        Document {
            slug: slug.to_string(),
            source_path: PathBuf::from(format!("{slug}/index.md")),
            directory: PathBuf::from(slug),
            front_matter,
            body: String::new(),
            body_line_offset: 0,
        }
    }

    #[test]
    fn rss_lists_items_with_rfc2822_dates() {
        let docs = [document("hooks", 2019, 2)];
        let xml = rss_feed(&site(), &docs);

        assert!(xml.contains("<title>Field Notes</title>"));
        assert!(xml.contains("<link>https://blog.example.com/hooks/</link>"));
        assert!(xml.contains("<pubDate>Fri, 01 Feb 2019 00:00:00 +0000</pubDate>"));
        assert!(xml.contains("<description>Why &lt;this&gt; &amp; that</description>"));
        assert!(xml.contains("<category>react</category>"));
    }

    #[test]
    fn atom_updated_tracks_newest_document() {
        let docs = [document("new", 2022, 3), document("old", 2018, 7)];
        let xml = atom_feed(&site(), &docs);

        assert!(xml.contains("<updated>2022-03-01T00:00:00Z</updated>\n  <link"));
        assert!(xml.contains("<id>https://blog.example.com/old/</id>"));
        assert!(xml.contains("<author><name>Sam Rivera</name></author>"));
    }

    #[test]
    fn empty_atom_feed_is_stable() {
        let none: [Document; 0] = [];
        let first = atom_feed(&site(), &none);
        let second = atom_feed(&site(), &none);
        assert_eq!(first, second);
        assert!(first.contains("<updated>1970-01-01T00:00:00Z</updated>"));
    }
}
