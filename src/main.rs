use std::process;

use quire::{
    application::{
        error::AppError,
        render::{RenderPipelineConfig, configure_render_service, render_service},
        site::{BuildError, RenderMode, SiteBuilder, render_file},
    },
    config::{self, BuildArgs, Command, RenderArgs, Settings},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(target = "quire", error = %report.chain(), "command failed");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(target = "quire", error = %report.chain(), "command failed");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(Command::Build(BuildArgs::default()));

    telemetry::init(&settings.logging)?;
    configure_render_service(RenderPipelineConfig::from_settings(
        &settings.render,
        settings.comments.as_ref(),
    ))
    .map_err(|err| AppError::unexpected(err.to_string()))?;

    match command {
        Command::Build(_) => run_build(&settings).await,
        Command::Check(_) => run_check(&settings).await,
        Command::Render(args) => run_render(args).await,
    }
}

async fn run_build(settings: &Settings) -> Result<(), AppError> {
    let builder = SiteBuilder::from_settings(settings, render_service());
    match builder.build().await {
        Ok(summary) => {
            info!(
                target = "quire::build",
                documents = summary.documents,
                drafts_skipped = summary.drafts_skipped,
                warnings = summary.warnings,
                "build finished"
            );
            Ok(())
        }
        Err(BuildError::Lint(report)) => {
            for diagnostic in report.diagnostics() {
                eprintln!("{diagnostic}");
            }
            Err(AppError::from(BuildError::Lint(report)))
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_check(settings: &Settings) -> Result<(), AppError> {
    let builder = SiteBuilder::from_settings(settings, render_service());
    match builder.check().await {
        Ok(corpus) => {
            println!("{}", corpus.report);
            Ok(())
        }
        Err(BuildError::Lint(report)) => {
            println!("{report}");
            Err(AppError::from(BuildError::Lint(report)))
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let mode = if args.json {
        RenderMode::Json
    } else if args.no_sanitize {
        RenderMode::Unsanitized
    } else {
        RenderMode::Sanitized
    };

    let service = render_service();
    let html = tokio::task::spawn_blocking(move || render_file(&args.file, &service, mode))
        .await
        .map_err(|err| AppError::unexpected(format!("render task failed: {err}")))??;
    println!("{html}");
    Ok(())
}

