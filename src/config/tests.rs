use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.site.title, DEFAULT_SITE_TITLE);
    assert_eq!(settings.site.base_url.as_str(), DEFAULT_BASE_URL);
    assert_eq!(settings.content.directory, PathBuf::from(DEFAULT_CONTENT_DIR));
    assert!(!settings.content.include_drafts);
    assert_eq!(settings.output.directory, PathBuf::from(DEFAULT_OUTPUT_DIR));
    assert!(settings.output.clean);
    assert_eq!(settings.render.concurrency.get(), DEFAULT_RENDER_CONCURRENCY);
    assert_eq!(settings.render.words_per_minute, DEFAULT_WORDS_PER_MINUTE);
    assert!(settings.comments.is_none());
    assert_eq!(settings.logging.level, LevelFilter::INFO);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.content.directory = Some(PathBuf::from("from-file"));
    raw.logging.level = Some("info".to_string());
    raw.render.concurrency = Some(2);

    let args = CliArgs::parse_from([
        "quire",
        "--log-level",
        "debug",
        "build",
        "--content-dir",
        "articles",
        "--concurrency",
        "8",
        "--drafts",
    ]);
    raw.apply_cli(&args);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.content.directory, PathBuf::from("articles"));
    assert!(settings.content.include_drafts);
    assert_eq!(settings.render.concurrency.get(), 8);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn concurrency_is_clamped() {
    let mut raw = RawSettings::default();
    raw.render.concurrency = Some(500);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.render.concurrency.get(), MAX_RENDER_CONCURRENCY);

    let mut raw = RawSettings::default();
    raw.render.concurrency = Some(0);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.render.concurrency.get(), 1);
}

#[test]
fn base_url_gains_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.site.base_url = Some("https://example.com/blog".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.base_url.as_str(), "https://example.com/blog/");
}

#[test]
fn base_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.site.base_url = Some("ftp://example.com".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid");
    assert!(matches!(err, LoadError::Invalid { key: "site.base_url", .. }));
}

#[test]
fn comments_require_owner_and_name() {
    let mut raw = RawSettings::default();
    raw.comments.repo = Some("just-a-name".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid");
    assert!(matches!(err, LoadError::Invalid { key: "comments.repo", .. }));

    let mut raw = RawSettings::default();
    raw.comments.repo = Some("owner/blog-comments".to_string());
    raw.comments.label = Some("  ".to_string());
    let comments = Settings::from_raw(raw)
        .expect("valid settings")
        .comments
        .expect("comments enabled");
    assert_eq!(comments.issue_term, DEFAULT_COMMENTS_ISSUE_TERM);
    assert_eq!(comments.script_url, DEFAULT_COMMENTS_SCRIPT_URL);
    assert_eq!(comments.label, None);
}

#[test]
fn allowed_prefixes_must_be_site_absolute() {
    let mut raw = RawSettings::default();
    raw.lint.allowed_internal_prefixes = Some(vec!["static/".to_string()]);
    let err = Settings::from_raw(raw).expect_err("invalid");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "lint.allowed_internal_prefixes",
            ..
        }
    ));
}

#[test]
fn json_logging_flag_without_value() {
    let mut raw = RawSettings::default();
    let args = CliArgs::parse_from(["quire", "check", "--log-json"]);
    raw.apply_cli(&args);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_build_command() {
    let args = CliArgs::parse_from(["quire"]);
    let command = args
        .command
        .unwrap_or(Command::Build(BuildArgs::default()));
    assert!(matches!(command, Command::Build(_)));
}

#[test]
fn parse_build_arguments() {
    let args = CliArgs::parse_from([
        "quire",
        "build",
        "--output-dir",
        "dist",
        "--base-url",
        "https://example.com",
        "--clean=false",
    ]);

    match args.command.expect("build command") {
        Command::Build(build) => {
            assert_eq!(build.output_dir, Some(PathBuf::from("dist")));
            assert_eq!(build.base_url.as_deref(), Some("https://example.com"));
            assert_eq!(build.clean, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_check_arguments() {
    let mut raw = RawSettings::default();
    let args = CliArgs::parse_from(["quire", "check", "--deny-warnings", "--content-dir", "posts"]);
    raw.apply_cli(&args);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.lint.deny_warnings);
    assert_eq!(settings.content.directory, PathBuf::from("posts"));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from(["quire", "render", "--no-sanitize", "content/hooks/index.md"]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert!(render.no_sanitize);
            assert!(!render.json);
            assert_eq!(render.file, PathBuf::from("content/hooks/index.md"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn render_json_conflicts_with_no_sanitize() {
    let result = CliArgs::try_parse_from(["quire", "render", "--json", "--no-sanitize", "post.md"]);
    assert!(result.is_err());
}
