//! HTML page rendering via askama templates.

pub mod views;

/// Stylesheet written to `site.css`: `static/site.css` plus the syntax
/// highlighting theme, combined by the build script.
pub const SITE_STYLESHEET: &str = include_str!(env!("SITE_CSS_FILE"));
