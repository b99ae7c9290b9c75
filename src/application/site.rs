//! Site build orchestration.
//!
//! A build loads every source file, parses front matter, renders bodies on
//! blocking worker threads and lints the whole corpus before anything is
//! written. Output is only produced for a corpus that passes the lint.

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::{StreamExt, TryStreamExt, stream};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::{
    application::{
        error::AppError,
        frontmatter::parse_document,
        lint::{CorpusInput, Diagnostic, LintOptions, LintReport, LintedDocument, lint_corpus},
        render::{ComrakRenderService, RenderError, RenderOutput, RenderRequest, RenderService},
        sitemap::{robots_txt, sitemap_xml},
        syndication::{atom_feed, rss_feed},
    },
    config::{Settings, SiteSettings},
    domain::document::{Document, TargetKind, classify_target, resolve_within},
    infra::{
        content::{load_sources, read_source},
        error::InfraError,
        output::SiteWriter,
    },
    presentation::{
        SITE_STYLESHEET,
        views::{
            ErrorTemplate, IndexTemplate, PostCard, PostTemplate, TemplateRenderError,
            render_template,
        },
    },
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("lint failed with {} error(s) and {} warning(s)", .0.error_count(), .0.warning_count())]
    Lint(LintReport),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Template(#[from] TemplateRenderError),
    #[error("render task failed: {0}")]
    Join(#[from] JoinError),
}

/// Knobs for a single build or check run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub include_drafts: bool,
    pub clean: bool,
    pub concurrency: NonZeroUsize,
    pub deny_warnings: bool,
    pub lint: LintOptions,
}

impl BuildOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            content_dir: settings.content.directory.clone(),
            output_dir: settings.output.directory.clone(),
            include_drafts: settings.content.include_drafts,
            clean: settings.output.clean,
            concurrency: settings.render.concurrency,
            deny_warnings: settings.lint.deny_warnings,
            lint: LintOptions {
                allowed_internal_prefixes: settings.lint.allowed_internal_prefixes.clone(),
                known_extra_keys: settings.lint.known_extra_keys.clone(),
            },
        }
    }
}

/// A published document with its rendered body.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub document: Document,
    pub output: RenderOutput,
}

/// Everything a successful check produces; a build writes it out.
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    /// Newest first, ties broken by slug.
    pub documents: Vec<RenderedDocument>,
    pub report: LintReport,
    pub drafts_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub documents: usize,
    pub drafts_skipped: usize,
    pub files_written: usize,
    pub assets_copied: usize,
    pub warnings: usize,
    pub output_dir: PathBuf,
}

pub struct SiteBuilder {
    site: SiteSettings,
    options: BuildOptions,
    renderer: Arc<dyn RenderService>,
}

impl SiteBuilder {
    pub fn new(site: SiteSettings, options: BuildOptions, renderer: Arc<dyn RenderService>) -> Self {
        Self {
            site,
            options,
            renderer,
        }
    }

    pub fn from_settings(settings: &Settings, renderer: Arc<dyn RenderService>) -> Self {
        Self::new(
            settings.site.clone(),
            BuildOptions::from_settings(settings),
            renderer,
        )
    }

    /// Parse, render and lint without touching the output directory.
    pub async fn check(&self) -> Result<PreparedCorpus, BuildError> {
        let content_dir = self.options.content_dir.clone();
        let sources = tokio::task::spawn_blocking(move || load_sources(&content_dir)).await??;

        let mut failures = Vec::new();
        let mut documents = Vec::with_capacity(sources.len());
        let mut drafts_skipped = 0usize;
        for source in &sources {
            match parse_document(source) {
                Ok(document) if document.front_matter.draft && !self.options.include_drafts => {
                    debug!(
                        target = "quire::build",
                        slug = %document.slug,
                        "skipping draft"
                    );
                    drafts_skipped += 1;
                }
                Ok(document) => documents.push(document),
                Err(err) => failures.push(Diagnostic::from_front_matter(source, &err)),
            }
        }
        documents.sort_by(newest_first);

        let mut rendered = Vec::with_capacity(documents.len());
        let mut unrendered = Vec::new();
        for (document, result) in self.render_all(documents).await? {
            match result {
                Ok(output) => rendered.push(RenderedDocument { document, output }),
                Err(err) => {
                    failures.push(Diagnostic::from_render(&document, &err));
                    unrendered.push(document);
                }
            }
        }

        let report = {
            let mut entries: Vec<LintedDocument<'_>> = rendered
                .iter()
                .map(|entry| LintedDocument {
                    document: &entry.document,
                    references: &entry.output.references,
                })
                .chain(unrendered.iter().map(|document| LintedDocument {
                    document,
                    references: &[],
                }))
                .collect();
            entries.sort_by(|a, b| a.document.source_path.cmp(&b.document.source_path));

            lint_corpus(&CorpusInput {
                documents: entries,
                failures,
                options: self.options.lint.clone(),
            })
        };

        info!(
            target = "quire::build",
            sources = sources.len(),
            documents = rendered.len(),
            drafts_skipped,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "corpus checked"
        );

        if report.fails(self.options.deny_warnings) {
            return Err(BuildError::Lint(report));
        }

        Ok(PreparedCorpus {
            documents: rendered,
            report,
            drafts_skipped,
        })
    }

    /// Check the corpus and, if it passes, write the static site.
    pub async fn build(&self) -> Result<BuildSummary, BuildError> {
        let corpus = self.check().await?;
        for diagnostic in corpus.report.warnings() {
            warn!(target = "quire::build", "{diagnostic}");
        }
        self.write(&corpus).await
    }

    async fn render_all(
        &self,
        documents: Vec<Document>,
    ) -> Result<Vec<(Document, Result<RenderOutput, RenderError>)>, BuildError> {
        let mut results: Vec<_> = stream::iter(documents.into_iter().enumerate())
            .map(|(index, document)| {
                let renderer = Arc::clone(&self.renderer);
                tokio::task::spawn_blocking(move || {
                    let request = RenderRequest::new(document.slug.clone(), document.body.clone())
                        .with_document_dir(document.directory.clone());
                    let result = renderer.render(&request);
                    (index, document, result)
                })
            })
            .buffer_unordered(self.options.concurrency.get())
            .try_collect()
            .await?;

        results.sort_by_key(|(index, _, _)| *index);
        Ok(results
            .into_iter()
            .map(|(_, document, result)| (document, result))
            .collect())
    }

    async fn write(&self, corpus: &PreparedCorpus) -> Result<BuildSummary, BuildError> {
        let writer = SiteWriter::prepare(
            &self.options.output_dir,
            self.options.clean,
            &self.options.content_dir,
        )
        .await?;

        let mut files_written = 0usize;
        let mut assets_copied = 0usize;
        for entry in &corpus.documents {
            let page = render_template(PostTemplate::build(
                &self.site,
                &entry.document,
                &entry.output,
            ))?;
            writer.write_page(&entry.document.slug, &page).await?;
            files_written += 1;

            for asset in local_assets(entry) {
                writer
                    .copy_asset(&asset.source, &entry.document.slug, &asset.relative)
                    .await?;
                assets_copied += 1;
            }
        }

        let documents: Vec<&Document> = corpus.documents.iter().map(|entry| &entry.document).collect();
        let cards = corpus
            .documents
            .iter()
            .map(|entry| PostCard::new(&entry.document, &entry.output))
            .collect();

        let root_files = [
            ("index.html", render_template(IndexTemplate::build(&self.site, cards))?),
            ("404.html", render_template(ErrorTemplate::not_found(&self.site))?),
            ("rss.xml", rss_feed(&self.site, documents.iter().copied())),
            ("atom.xml", atom_feed(&self.site, documents.iter().copied())),
            ("sitemap.xml", sitemap_xml(&self.site, documents.iter().copied())),
            ("robots.txt", robots_txt(&self.site)),
            ("site.css", SITE_STYLESHEET.to_string()),
        ];
        for (name, contents) in root_files {
            writer.write_file(name, contents).await?;
            files_written += 1;
        }

        let summary = BuildSummary {
            documents: corpus.documents.len(),
            drafts_skipped: corpus.drafts_skipped,
            files_written,
            assets_copied,
            warnings: corpus.report.warning_count(),
            output_dir: writer.root().to_path_buf(),
        };
        info!(
            target = "quire::build",
            documents = summary.documents,
            files = summary.files_written,
            assets = summary.assets_copied,
            output = %summary.output_dir.display(),
            "site written"
        );
        Ok(summary)
    }
}

/// What `quire render` prints for a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Sanitized,
    Unsanitized,
    Json,
}

/// Render one markdown file outside of a corpus build.
pub fn render_file(
    path: &Path,
    service: &ComrakRenderService,
    mode: RenderMode,
) -> Result<String, AppError> {
    let source = read_source(path)?;
    let document = parse_document(&source)?;
    let request = RenderRequest::new(document.slug.clone(), document.body.clone())
        .with_document_dir(document.directory.clone());

    match mode {
        RenderMode::Sanitized => Ok(service.render(&request)?.html),
        RenderMode::Unsanitized => Ok(service.render_unsanitized(&request)?),
        RenderMode::Json => {
            let output = service.render(&request)?;
            serde_json::to_string_pretty(&output)
                .map_err(|err| AppError::unexpected(format!("failed to encode render output: {err}")))
        }
    }
}

fn newest_first(a: &Document, b: &Document) -> Ordering {
    b.front_matter
        .date
        .cmp(&a.front_matter.date)
        .then_with(|| a.slug.cmp(&b.slug))
}

struct LocalAsset {
    source: PathBuf,
    /// Path under the document's output directory.
    relative: PathBuf,
}

/// Banner and body references that resolve to files inside the document
/// directory.
fn local_assets(entry: &RenderedDocument) -> Vec<LocalAsset> {
    let document = &entry.document;
    let targets = document
        .front_matter
        .banner
        .as_deref()
        .into_iter()
        .chain(entry.output.references.iter().map(|reference| reference.target.as_str()));

    let mut seen = BTreeSet::new();
    let mut assets = Vec::new();
    for target in targets {
        let TargetKind::Relative(path) = classify_target(target) else {
            continue;
        };
        let Some(relative) = resolve_within(Path::new(""), path) else {
            continue;
        };
        let source = document.directory.join(&relative);
        if source == document.source_path || !source.is_file() {
            continue;
        }
        if seen.insert(relative.clone()) {
            assets.push(LocalAsset { source, relative });
        }
    }
    assets
}
