//! Documents as discovered on disk and after front matter extraction.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use time::{Date, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const ISO_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// A document file located by the content loader, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path of the markdown file itself.
    pub path: PathBuf,
    /// Directory that relative references (images, banner) resolve against.
    pub directory: PathBuf,
    pub slug: String,
    pub text: String,
}

/// Parsed metadata header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub description: Option<String>,
    pub date: Date,
    pub banner: Option<String>,
    pub tags: Vec<String>,
    pub draft: bool,
    /// Keys the pipeline does not interpret, kept verbatim.
    pub extra: BTreeMap<String, String>,
}

impl FrontMatter {
    /// Build a header, enforcing the title invariant and normalising the
    /// optional fields (blank strings collapse to `None`, tags are trimmed and
    /// de-duplicated preserving first occurrence).
    pub fn new(
        title: &str,
        date: Date,
        description: Option<&str>,
        banner: Option<&str>,
        tags: &[String],
    ) -> Result<Self, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title must not be blank"));
        }

        let mut normalized_tags: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim();
            if !tag.is_empty() && !normalized_tags.iter().any(|seen| seen == tag) {
                normalized_tags.push(tag.to_string());
            }
        }

        Ok(Self {
            title: title.to_string(),
            description: non_blank(description),
            date,
            banner: non_blank(banner),
            tags: normalized_tags,
            draft: false,
            extra: BTreeMap::new(),
        })
    }

    pub fn human_date(&self) -> String {
        self.date
            .format(HUMAN_DATE_FORMAT)
            .unwrap_or_else(|_| self.date.to_string())
    }

    pub fn iso_date(&self) -> String {
        self.date
            .format(ISO_DATE_FORMAT)
            .unwrap_or_else(|_| self.date.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// A parsed, immutable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub slug: String,
    pub source_path: PathBuf,
    pub directory: PathBuf,
    pub front_matter: FrontMatter,
    pub body: String,
    /// Number of file lines preceding the body (header plus delimiters).
    pub body_line_offset: usize,
}

impl Document {
    /// Site-relative URL path of the rendered page, always with a trailing slash.
    pub fn public_path(&self) -> String {
        format!("/{}/", self.slug)
    }
}

/// Join `reference` onto `base`, rejecting absolute paths and any `..`
/// component that would leave `base`. Percent escapes are decoded, so
/// `my%20photo.png` names the file `my photo.png`.
pub fn resolve_within(base: &Path, reference: &str) -> Option<PathBuf> {
    let cleaned = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference)
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(cleaned).decode_utf8_lossy();

    let mut resolved = base.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (depth > 0).then_some(resolved)
}

/// How a body reference should be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind<'a> {
    /// `#fragment` within the same page.
    Anchor,
    /// Anything with a URL scheme (`https:`, `mailto:`) or protocol-relative.
    External,
    /// Site-absolute path such as `/other-post/#intro`.
    SiteAbsolute(&'a str),
    /// Path relative to the document directory.
    Relative(&'a str),
}

pub fn classify_target(target: &str) -> TargetKind<'_> {
    let trimmed = target.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return TargetKind::Anchor;
    }
    if trimmed.starts_with("//") || has_scheme(trimmed) {
        return TargetKind::External;
    }
    if trimmed.starts_with('/') {
        return TargetKind::SiteAbsolute(trimmed);
    }
    TargetKind::Relative(trimmed)
}

fn has_scheme(value: &str) -> bool {
    let Some(colon) = value.find(':') else {
        return false;
    };
    let scheme = &value[..colon];
    !scheme.is_empty()
        && scheme.starts_with(|ch: char| ch.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

/// First path segment of a site-absolute or relative link, ignoring query
/// and fragment: `/hooks-migration/#state` yields `hooks-migration`.
pub fn leading_segment(path: &str) -> Option<&str> {
    path.split(['?', '#'])
        .next()
        .unwrap_or(path)
        .split('/')
        .find(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn front_matter_rejects_blank_title() {
        let err = FrontMatter::new("  ", date!(2021 - 03 - 04), None, None, &[])
            .expect_err("blank title");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn front_matter_normalises_optional_fields() {
        let tags = vec![
            " react ".to_string(),
            "typescript".to_string(),
            "react".to_string(),
            String::new(),
        ];
        let header = FrontMatter::new(
            " Typing reducers ",
            date!(2021 - 03 - 04),
            Some(""),
            Some(" ./banner.jpg "),
            &tags,
        )
        .expect("valid header");

        assert_eq!(header.title, "Typing reducers");
        assert_eq!(header.description, None);
        assert_eq!(header.banner.as_deref(), Some("./banner.jpg"));
        assert_eq!(header.tags, vec!["react", "typescript"]);
        assert_eq!(header.human_date(), "March 4, 2021");
        assert_eq!(header.iso_date(), "2021-03-04");
    }

    #[test]
    fn resolve_within_stays_inside_base() {
        let base = Path::new("/content/post");
        assert_eq!(
            resolve_within(base, "./images/a.png?w=2"),
            Some(PathBuf::from("/content/post/images/a.png"))
        );
        assert_eq!(
            resolve_within(base, "images/../b.png"),
            Some(PathBuf::from("/content/post/b.png"))
        );
        assert_eq!(resolve_within(base, "../other/c.png"), None);
        assert_eq!(resolve_within(base, "/abs.png"), None);
        assert_eq!(resolve_within(base, "#top"), None);
        assert_eq!(
            resolve_within(base, "my%20photo.png"),
            Some(PathBuf::from("/content/post/my photo.png"))
        );
        assert_eq!(resolve_within(base, "a%2F..%2F..%2Fescape.png"), None);
    }

    #[test]
    fn classifies_reference_targets() {
        assert_eq!(classify_target("#intro"), TargetKind::Anchor);
        assert_eq!(classify_target("https://react.dev"), TargetKind::External);
        assert_eq!(classify_target("mailto:me@example.com"), TargetKind::External);
        assert_eq!(classify_target("//cdn.example.com/x.js"), TargetKind::External);
        assert_eq!(
            classify_target("/typing-reducers/#unions"),
            TargetKind::SiteAbsolute("/typing-reducers/#unions")
        );
        assert_eq!(
            classify_target("./banner.jpg"),
            TargetKind::Relative("./banner.jpg")
        );
        assert_eq!(
            classify_target("../hooks/"),
            TargetKind::Relative("../hooks/")
        );
    }

    #[test]
    fn leading_segment_skips_dots_and_fragments() {
        assert_eq!(leading_segment("/hooks-migration/#state"), Some("hooks-migration"));
        assert_eq!(leading_segment("../hooks-migration"), Some("hooks-migration"));
        assert_eq!(leading_segment("/"), None);
    }
}
