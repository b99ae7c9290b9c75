//! Corpus linting.
//!
//! Runs after every document has been parsed and rendered. Metadata problems
//! and dangling references are errors and fail the build; presentation gaps
//! such as a missing description are warnings.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    application::{
        frontmatter::FrontMatterError,
        render::{Reference, ReferenceKind, RenderError},
    },
    domain::{
        document::{Document, SourceFile, TargetKind, classify_target, leading_segment, resolve_within},
        slug::{derive_slug, is_canonical},
    },
};

/// Files the site writer emits at the output root. Links to them are never
/// dangling.
const GENERATED_ROOT_FILES: &[&str] = &[
    "atom.xml",
    "rss.xml",
    "sitemap.xml",
    "robots.txt",
    "site.css",
    "404.html",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub slug: Option<String>,
    pub path: PathBuf,
    /// 1-based line in the source file.
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            slug: None,
            path: path.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(path, message)
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn at_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    /// A document whose header could not be parsed.
    pub fn from_front_matter(source: &SourceFile, error: &FrontMatterError) -> Self {
        Diagnostic::error(&source.path, error.to_string())
            .with_slug(&source.slug)
            .at_line(error.line())
    }

    /// A document whose body failed to render. Body lines are shifted by the
    /// header length so the diagnostic points into the file.
    pub fn from_render(document: &Document, error: &RenderError) -> Self {
        Diagnostic::error(&document.source_path, error.to_string())
            .with_slug(&document.slug)
            .at_line(error.line().map(|line| line + document.body_line_offset))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.path.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of a lint pass, sorted by path then line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintReport {
    diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    pub fn new(mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.line.cmp(&b.line))
                .then(b.severity.cmp(&a.severity))
                .then(a.message.cmp(&b.message))
        });
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether the build must stop. With `deny_warnings`, any diagnostic does.
    pub fn fails(&self, deny_warnings: bool) -> bool {
        if deny_warnings {
            !self.is_clean()
        } else {
            self.has_errors()
        }
    }
}

impl fmt::Display for LintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.error_count(),
            self.warning_count()
        )
    }
}

/// A parsed document together with the references its body produced.
#[derive(Debug, Clone, Copy)]
pub struct LintedDocument<'a> {
    pub document: &'a Document,
    pub references: &'a [Reference],
}

#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// Site-absolute path prefixes that exist outside the corpus
    /// (e.g. `/static/`), so links under them are never flagged.
    pub allowed_internal_prefixes: Vec<String>,
    /// Front matter keys outside the core set that are expected.
    pub known_extra_keys: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusInput<'a> {
    pub documents: Vec<LintedDocument<'a>>,
    /// Diagnostics raised before linting (parse or render failures).
    pub failures: Vec<Diagnostic>,
    pub options: LintOptions,
}

pub fn lint_corpus(input: &CorpusInput<'_>) -> LintReport {
    let mut diagnostics = input.failures.clone();

    let known_slugs: BTreeSet<&str> = input
        .documents
        .iter()
        .map(|entry| entry.document.slug.as_str())
        .collect();

    check_slugs(&input.documents, &mut diagnostics);

    for entry in &input.documents {
        check_front_matter(entry.document, &input.options, &mut diagnostics);
        for reference in entry.references {
            check_reference(
                entry.document,
                reference,
                &known_slugs,
                &input.options,
                &mut diagnostics,
            );
        }
    }

    LintReport::new(diagnostics)
}

fn check_slugs(documents: &[LintedDocument<'_>], diagnostics: &mut Vec<Diagnostic>) {
    let mut first_seen: BTreeMap<&str, &Path> = BTreeMap::new();

    for entry in documents {
        let document = entry.document;
        if let Some(previous) = first_seen.get(document.slug.as_str()) {
            diagnostics.push(
                Diagnostic::error(
                    &document.source_path,
                    format!(
                        "duplicate slug `{}` (already used by {})",
                        document.slug,
                        previous.display()
                    ),
                )
                .with_slug(&document.slug),
            );
        } else {
            first_seen.insert(&document.slug, &document.source_path);
        }

        if !is_canonical(&document.slug) {
            let message = match derive_slug(&document.slug) {
                Ok(suggested) => format!(
                    "slug `{}` is not lowercase ASCII; rename it to `{suggested}`",
                    document.slug
                ),
                Err(err) => format!("slug `{}` is unusable: {err}", document.slug),
            };
            diagnostics.push(
                Diagnostic::error(&document.source_path, message).with_slug(&document.slug),
            );
        }
    }
}

fn check_front_matter(
    document: &Document,
    options: &LintOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let front_matter = &document.front_matter;

    if front_matter.description.is_none() {
        diagnostics.push(
            Diagnostic::warning(&document.source_path, "front matter has no `description`")
                .with_slug(&document.slug),
        );
    }

    if let Some(banner) = front_matter.banner.as_deref()
        && let TargetKind::Relative(path) = classify_target(banner)
    {
        match resolve_within(&document.directory, path) {
            Some(resolved) if resolved.is_file() => {}
            Some(_) => diagnostics.push(
                Diagnostic::error(
                    &document.source_path,
                    format!("banner `{banner}` does not exist in the document directory"),
                )
                .with_slug(&document.slug),
            ),
            None => diagnostics.push(
                Diagnostic::error(
                    &document.source_path,
                    format!("banner `{banner}` points outside the document directory"),
                )
                .with_slug(&document.slug),
            ),
        }
    }

    for key in front_matter.extra.keys() {
        if !options.known_extra_keys.iter().any(|known| known == key) {
            diagnostics.push(
                Diagnostic::warning(
                    &document.source_path,
                    format!("unknown front matter key `{key}`"),
                )
                .with_slug(&document.slug),
            );
        }
    }
}

fn check_reference(
    document: &Document,
    reference: &Reference,
    known_slugs: &BTreeSet<&str>,
    options: &LintOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let line = Some(reference.line + document.body_line_offset);
    let report = |message: String| {
        Diagnostic::error(&document.source_path, message)
            .with_slug(&document.slug)
            .at_line(line)
    };

    match reference.kind {
        ReferenceKind::Image => {
            if reference.missing_alt {
                diagnostics.push(
                    Diagnostic::warning(
                        &document.source_path,
                        format!("image `{}` has no alt text", reference.target),
                    )
                    .with_slug(&document.slug)
                    .at_line(line),
                );
            }

            if let TargetKind::Relative(path) = classify_target(&reference.target) {
                match resolve_within(&document.directory, path) {
                    Some(resolved) if resolved.is_file() => {}
                    Some(_) => diagnostics.push(report(format!(
                        "image `{}` does not exist in the document directory",
                        reference.target
                    ))),
                    None => diagnostics.push(report(format!(
                        "image `{}` points outside the document directory",
                        reference.target
                    ))),
                }
            }
        }
        ReferenceKind::Link => match classify_target(&reference.target) {
            TargetKind::Anchor | TargetKind::External => {}
            TargetKind::SiteAbsolute(path) => {
                if !site_path_exists(path, known_slugs, options) {
                    diagnostics.push(report(format!(
                        "link `{}` does not match any post",
                        reference.target
                    )));
                }
            }
            TargetKind::Relative(path) => {
                if let Some(resolved) = resolve_within(&document.directory, path)
                    && resolved.exists()
                {
                    return;
                }
                // `../other-post/` style sibling links.
                let sibling = path
                    .strip_prefix("../")
                    .and_then(leading_segment)
                    .is_some_and(|slug| known_slugs.contains(slug));
                if !sibling {
                    diagnostics.push(report(format!(
                        "relative link `{}` does not resolve to a file or post",
                        reference.target
                    )));
                }
            }
        },
    }
}

fn site_path_exists(path: &str, known_slugs: &BTreeSet<&str>, options: &LintOptions) -> bool {
    if options
        .allowed_internal_prefixes
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()))
    {
        return true;
    }

    match leading_segment(path) {
        None => true,
        Some(segment) => {
            known_slugs.contains(segment) || GENERATED_ROOT_FILES.contains(&segment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;
    use time::macros::date;

    use crate::domain::document::FrontMatter;

    fn document(root: &Path, slug: &str) -> Document {
        let directory = root.join(slug);
        fs::create_dir_all(&directory).expect("dir");
        let front_matter = FrontMatter::new(
            "Title",
            date!(2020 - 01 - 02),
            Some("About things"),
            None,
            &[],
        )
        .expect("front matter");
        Document {
            slug: slug.to_string(),
            source_path: directory.join("index.md"),
            directory,
            front_matter,
            body: String::new(),
            body_line_offset: 5,
        }
    }

    fn image(target: &str, line: usize, missing_alt: bool) -> Reference {
        Reference {
            kind: ReferenceKind::Image,
            target: target.to_string(),
            line,
            missing_alt,
        }
    }

    fn link(target: &str, line: usize) -> Reference {
        Reference {
            kind: ReferenceKind::Link,
            target: target.to_string(),
            line,
            missing_alt: false,
        }
    }

    fn lint(documents: &[(&Document, &[Reference])], options: LintOptions) -> LintReport {
        lint_corpus(&CorpusInput {
            documents: documents
                .iter()
                .map(|(document, references)| LintedDocument {
                    document,
                    references,
                })
                .collect(),
            failures: Vec::new(),
            options,
        })
    }

    #[test]
    fn clean_corpus_has_no_diagnostics() {
        let root = TempDir::new().expect("tempdir");
        let a = document(root.path(), "a-post");
        fs::write(a.directory.join("chart.png"), b"png").expect("write");
        let b = document(root.path(), "b-post");

        let refs_a = [
            image("./chart.png", 3, false),
            link("/b-post/#intro", 4),
            link("../b-post/", 5),
            link("https://example.com", 6),
            link("#local", 7),
            link("/rss.xml", 8),
        ];
        let report = lint(&[(&a, &refs_a), (&b, &[])], LintOptions::default());
        assert!(report.is_clean(), "{report}");
    }

    #[test]
    fn missing_image_is_an_error_with_file_line() {
        let root = TempDir::new().expect("tempdir");
        let a = document(root.path(), "a-post");
        let refs = [image("missing.png", 2, false)];

        let report = lint(&[(&a, &refs)], LintOptions::default());
        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, Some(7));
        assert!(errors[0].message.contains("missing.png"));
    }

    #[test]
    fn unknown_cross_post_link_is_an_error_unless_allowed() {
        let root = TempDir::new().expect("tempdir");
        let a = document(root.path(), "a-post");
        let refs = [link("/nowhere/", 1), link("/static/logo.svg", 2)];

        let report = lint(&[(&a, &refs)], LintOptions::default());
        assert_eq!(report.error_count(), 2);

        let options = LintOptions {
            allowed_internal_prefixes: vec!["/static/".to_string()],
            ..LintOptions::default()
        };
        let report = lint(&[(&a, &refs)], options);
        assert_eq!(report.error_count(), 1);
        assert!(report.errors().all(|d| d.message.contains("/nowhere/")));
    }

    #[test]
    fn duplicate_and_non_canonical_slugs_fail() {
        let root = TempDir::new().expect("tempdir");
        let first = document(root.path(), "same");
        let mut second = document(root.path(), "same");
        second.source_path = root.path().join("same.md");
        let odd = document(root.path(), "Odd Name");

        let report = lint(&[(&first, &[]), (&second, &[]), (&odd, &[])], LintOptions::default());
        let messages: Vec<_> = report.errors().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("duplicate slug `same`")));
        assert!(messages.iter().any(|m| m.contains("rename it to `odd-name`")));
    }

    #[test]
    fn presentation_gaps_are_warnings() {
        let root = TempDir::new().expect("tempdir");
        let mut a = document(root.path(), "a-post");
        a.front_matter.description = None;
        a.front_matter
            .extra
            .insert("spoiler".to_string(), "x".to_string());
        a.front_matter
            .extra
            .insert("author".to_string(), "x".to_string());
        fs::write(a.directory.join("x.png"), b"png").expect("write");
        let refs = [image("x.png", 1, true)];

        let options = LintOptions {
            known_extra_keys: vec!["author".to_string()],
            ..LintOptions::default()
        };
        let report = lint(&[(&a, &refs)], options);
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 3);
        assert!(!report.fails(false));
        assert!(report.fails(true));
    }

    #[test]
    fn missing_banner_is_an_error() {
        let root = TempDir::new().expect("tempdir");
        let mut a = document(root.path(), "a-post");
        a.front_matter.banner = Some("banner.jpg".to_string());

        let report = lint(&[(&a, &[])], LintOptions::default());
        assert_eq!(report.error_count(), 1);

        fs::write(a.directory.join("banner.jpg"), b"jpg").expect("write");
        let report = lint(&[(&a, &[])], LintOptions::default());
        assert!(report.is_clean());
    }

    #[test]
    fn relative_link_to_missing_file_fails() {
        let root = TempDir::new().expect("tempdir");
        let a = document(root.path(), "a-post");
        fs::write(a.directory.join("demo.zip"), b"zip").expect("write");
        let refs = [link("demo.zip", 1), link("notes.txt", 2), link("../ghost/", 3)];

        let report = lint(&[(&a, &refs)], LintOptions::default());
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn report_renders_one_line_per_diagnostic() {
        let report = LintReport::new(vec![
            Diagnostic::warning("b.md", "late"),
            Diagnostic::error("a.md", "early").at_line(Some(3)),
        ]);
        assert_eq!(
            report.to_string(),
            "error: a.md:3: early\nwarning: b.md: late\n1 error(s), 1 warning(s)"
        );
    }
}
