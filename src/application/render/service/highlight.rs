use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

/// Fence info aliases that syntect does not resolve on its own.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("shell", "bash"),
    ("sh", "bash"),
    ("zsh", "bash"),
    ("console", "bash"),
    ("jsonc", "json"),
    ("json5", "json"),
    ("vue", "html"),
    ("svelte", "html"),
    ("mjs", "js"),
    ("cjs", "js"),
    ("mts", "ts"),
    ("cts", "ts"),
];

/// Parsed fence info string: ```` ```tsx title="store.ts" ````.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct FenceInfo {
    pub(crate) language: Option<String>,
    pub(crate) title: Option<String>,
}

impl FenceInfo {
    pub(crate) fn parse(info: &str) -> Self {
        let mut segments = info.trim().splitn(2, char::is_whitespace);
        let language = segments
            .next()
            .filter(|lang| !lang.is_empty())
            .map(|lang| lang.to_ascii_lowercase());
        let title = segments.next().and_then(extract_title);
        Self { language, title }
    }
}

fn extract_title(meta: &str) -> Option<String> {
    let start = meta.find("title=")? + "title=".len();
    let rest = &meta[start..];
    let value = match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let body = &rest[1..];
            &body[..body.find(quote)?]
        }
        _ => rest.split_whitespace().next()?,
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(crate) fn highlight_code(
    fence: &FenceInfo,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let lang_token = fence.language.as_deref().unwrap_or("text");
    let syntax =
        find_syntax(syntax_set, lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: lang_token.to_string(),
                message: err.to_string(),
            })?;
    }

    let highlighted = generator.finalize();
    let lang_class = css_token(lang_token);
    let pre = format!(
        "<pre class=\"syntax-highlight syntax-lang-{lang_class}\" data-language=\"{lang_class}\"><code class=\"language-{lang_class} syntax-code\">{highlighted}</code></pre>"
    );

    Ok(match fence.title.as_deref() {
        Some(title) => format!(
            "<figure class=\"code-figure\" data-role=\"code-figure\"><figcaption class=\"code-title\">{}</figcaption>{pre}</figure>",
            ammonia::clean_text(title)
        ),
        None => pre,
    })
}

fn css_token(token: &str) -> String {
    token
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+' | '#'))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    let resolved = LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowercase)
        .map(|(_, target)| *target)
        .unwrap_or(lowercase.as_str());

    syntax_set
        .find_syntax_by_token(resolved)
        .or_else(|| syntax_set.find_syntax_by_name(resolved))
        .or_else(|| syntax_set.find_syntax_by_extension(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_info_extracts_language_and_title() {
        assert_eq!(
            FenceInfo::parse("TSX title=\"store.ts\" {1,3}"),
            FenceInfo {
                language: Some("tsx".to_string()),
                title: Some("store.ts".to_string()),
            }
        );
        assert_eq!(
            FenceInfo::parse("js title=app.js"),
            FenceInfo {
                language: Some("js".to_string()),
                title: Some("app.js".to_string()),
            }
        );
        assert_eq!(FenceInfo::parse(""), FenceInfo::default());
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let class_style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
        let fence = FenceInfo::parse("klingon");
        let html = highlight_code(&fence, "qapla'", &syntax_set, &class_style).expect("html");
        assert!(html.starts_with("<pre class=\"syntax-highlight syntax-lang-klingon\""));
        assert!(html.contains("qapla"));
    }

    #[test]
    fn titled_fence_is_wrapped_in_figure() {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let class_style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
        let fence = FenceInfo::parse("rust title=\"<main>.rs\"");
        let html =
            highlight_code(&fence, "fn main() {}\n", &syntax_set, &class_style).expect("html");
        assert!(html.starts_with("<figure class=\"code-figure\""));
        assert!(html.contains("&lt;main&gt;.rs"));
        assert!(html.contains("syntax-"));
    }
}
