//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{BuildArgs, CheckArgs, CliArgs, Command, ContentOverrides, RenderArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
const ENV_PREFIX: &str = "QUIRE";
const DEFAULT_SITE_TITLE: &str = "Quire";
const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_OUTPUT_DIR: &str = "public";
const DEFAULT_RENDER_CONCURRENCY: usize = 4;
const MAX_RENDER_CONCURRENCY: usize = 32;
const DEFAULT_WORDS_PER_MINUTE: u32 = 225;
const DEFAULT_COMMENTS_SCRIPT_URL: &str = "https://utteranc.es/client.js";
const DEFAULT_COMMENTS_ISSUE_TERM: &str = "pathname";
const DEFAULT_COMMENTS_THEME: &str = "github-light";

#[derive(Debug, Clone)]
pub struct Settings {
    pub site: SiteSettings,
    pub content: ContentSettings,
    pub output: OutputSettings,
    pub render: RenderSettings,
    pub comments: Option<CommentsSettings>,
    pub lint: LintSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub title: String,
    pub description: String,
    /// Always ends with `/`.
    pub base_url: Url,
    pub language: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub directory: PathBuf,
    pub include_drafts: bool,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub clean: bool,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Clamped to `1..=32`.
    pub concurrency: NonZeroUsize,
    pub words_per_minute: u32,
}

/// Present only when a comments repository is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentsSettings {
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
    pub label: Option<String>,
    pub script_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct LintSettings {
    pub allowed_internal_prefixes: Vec<String>,
    pub known_extra_keys: Vec<String>,
    pub deny_warnings: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli(cli);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    site: RawSiteSettings,
    content: RawContentSettings,
    output: RawOutputSettings,
    render: RawRenderSettings,
    comments: RawCommentsSettings,
    lint: RawLintSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_cli(&mut self, cli: &CliArgs) {
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }

        match cli.command.as_ref() {
            Some(Command::Build(args)) => self.apply_build_overrides(args),
            Some(Command::Check(args)) => self.apply_check_overrides(args),
            Some(Command::Render(_)) => {}
            None => self.apply_build_overrides(&BuildArgs::default()),
        }
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(dir) = overrides.content_dir.as_ref() {
            self.content.directory = Some(dir.clone());
        }
        if overrides.drafts {
            self.content.include_drafts = Some(true);
        }
    }

    fn apply_build_overrides(&mut self, args: &BuildArgs) {
        self.apply_content_overrides(&args.content);
        if let Some(dir) = args.output_dir.as_ref() {
            self.output.directory = Some(dir.clone());
        }
        if let Some(clean) = args.clean {
            self.output.clean = Some(clean);
        }
        if let Some(concurrency) = args.concurrency {
            self.render.concurrency = Some(concurrency);
        }
        if let Some(base_url) = args.base_url.as_ref() {
            self.site.base_url = Some(base_url.clone());
        }
    }

    fn apply_check_overrides(&mut self, args: &CheckArgs) {
        self.apply_content_overrides(&args.content);
        if args.deny_warnings {
            self.lint.deny_warnings = Some(true);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            site,
            content,
            output,
            render,
            comments,
            lint,
            logging,
        } = raw;

        Ok(Self {
            site: build_site_settings(site)?,
            content: build_content_settings(content)?,
            output: build_output_settings(output)?,
            render: build_render_settings(render)?,
            comments: build_comments_settings(comments)?,
            lint: build_lint_settings(lint)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let title = non_blank(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());
    let description = non_blank(site.description).unwrap_or_default();
    let language = non_blank(site.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let author = non_blank(site.author);

    let raw_url = non_blank(site.base_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = parse_base_url(&raw_url)
        .map_err(|reason| LoadError::invalid("site.base_url", reason))?;

    Ok(SiteSettings {
        title,
        description,
        base_url,
        language,
        author,
    })
}

fn parse_base_url(raw: &str) -> Result<Url, String> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash).map_err(|err| format!("`{raw}` is not a URL: {err}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("`{raw}` must use http or https"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("`{raw}` must not carry a query or fragment"));
    }
    Ok(url)
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let directory = content
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.directory",
            "path must not be empty",
        ));
    }

    Ok(ContentSettings {
        directory,
        include_drafts: content.include_drafts.unwrap_or(false),
    })
}

fn build_output_settings(output: RawOutputSettings) -> Result<OutputSettings, LoadError> {
    let directory = output
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "output.directory",
            "path must not be empty",
        ));
    }

    Ok(OutputSettings {
        directory,
        clean: output.clean.unwrap_or(true),
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let requested = render.concurrency.unwrap_or(DEFAULT_RENDER_CONCURRENCY);
    let concurrency = NonZeroUsize::new(requested.clamp(1, MAX_RENDER_CONCURRENCY))
        .ok_or_else(|| LoadError::invalid("render.concurrency", "must be greater than zero"))?;

    let words_per_minute = render.words_per_minute.unwrap_or(DEFAULT_WORDS_PER_MINUTE);
    if words_per_minute == 0 {
        return Err(LoadError::invalid(
            "render.words_per_minute",
            "must be greater than zero",
        ));
    }

    Ok(RenderSettings {
        concurrency,
        words_per_minute,
    })
}

fn build_comments_settings(
    comments: RawCommentsSettings,
) -> Result<Option<CommentsSettings>, LoadError> {
    let Some(repo) = non_blank(comments.repo) else {
        return Ok(None);
    };

    let mut parts = repo.split('/');
    let valid_repo = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    );
    if !valid_repo {
        return Err(LoadError::invalid(
            "comments.repo",
            format!("`{repo}` must look like `owner/name`"),
        ));
    }

    let script_url = non_blank(comments.script_url)
        .unwrap_or_else(|| DEFAULT_COMMENTS_SCRIPT_URL.to_string());
    let parsed = Url::parse(&script_url)
        .map_err(|err| LoadError::invalid("comments.script_url", err.to_string()))?;
    if parsed.scheme() != "https" {
        return Err(LoadError::invalid(
            "comments.script_url",
            "script must be served over https",
        ));
    }

    Ok(Some(CommentsSettings {
        repo,
        issue_term: non_blank(comments.issue_term)
            .unwrap_or_else(|| DEFAULT_COMMENTS_ISSUE_TERM.to_string()),
        theme: non_blank(comments.theme).unwrap_or_else(|| DEFAULT_COMMENTS_THEME.to_string()),
        label: non_blank(comments.label),
        script_url,
    }))
}

fn build_lint_settings(lint: RawLintSettings) -> Result<LintSettings, LoadError> {
    let mut allowed_internal_prefixes = Vec::new();
    for prefix in lint.allowed_internal_prefixes.unwrap_or_default() {
        let prefix = prefix.trim();
        if !prefix.starts_with('/') {
            return Err(LoadError::invalid(
                "lint.allowed_internal_prefixes",
                format!("`{prefix}` must start with `/`"),
            ));
        }
        allowed_internal_prefixes.push(prefix.to_string());
    }

    let known_extra_keys = lint
        .known_extra_keys
        .unwrap_or_default()
        .into_iter()
        .filter_map(|key| non_blank(Some(key)))
        .collect();

    Ok(LintSettings {
        allowed_internal_prefixes,
        known_extra_keys,
        deny_warnings: lint.deny_warnings.unwrap_or(false),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    description: Option<String>,
    base_url: Option<String>,
    language: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    directory: Option<PathBuf>,
    include_drafts: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutputSettings {
    directory: Option<PathBuf>,
    clean: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    concurrency: Option<usize>,
    words_per_minute: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCommentsSettings {
    repo: Option<String>,
    issue_term: Option<String>,
    theme: Option<String>,
    label: Option<String>,
    script_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLintSettings {
    allowed_internal_prefixes: Option<Vec<String>>,
    known_extra_keys: Option<Vec<String>>,
    deny_warnings: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[cfg(test)]
mod tests;
