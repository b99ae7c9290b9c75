use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the quire binary.
#[derive(Debug, Parser)]
#[command(
    name = "quire",
    version,
    about = "Build, lint and preview a markdown article corpus"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "QUIRE_CONFIG_FILE",
        value_name = "PATH",
        global = true,
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        global = true,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render every document and write the static site (default).
    Build(BuildArgs),
    /// Parse, render and lint the corpus without writing anything.
    Check(CheckArgs),
    /// Print the rendered HTML body of a single document.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the content directory.
    #[arg(long = "content-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub content_dir: Option<PathBuf>,

    /// Include documents marked `draft: true`.
    #[arg(long = "drafts", action = clap::ArgAction::SetTrue)]
    pub drafts: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub content: ContentOverrides,

    /// Override the output directory.
    #[arg(long = "output-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of concurrent render tasks.
    #[arg(long, value_name = "COUNT")]
    pub concurrency: Option<usize>,

    /// Override the public base URL used for feeds and canonical links.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Remove the output directory before writing.
    #[arg(
        long = "clean",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub clean: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub content: ContentOverrides,

    /// Treat lint warnings as errors.
    #[arg(long = "deny-warnings", action = clap::ArgAction::SetTrue)]
    pub deny_warnings: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Skip HTML sanitisation (diagnostics only).
    #[arg(long = "no-sanitize", action = clap::ArgAction::SetTrue)]
    pub no_sanitize: bool,

    /// Print the full render output (HTML, TOC, references, metrics) as JSON.
    #[arg(long = "json", action = clap::ArgAction::SetTrue, conflicts_with = "no_sanitize")]
    pub json: bool,

    /// Markdown document to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
