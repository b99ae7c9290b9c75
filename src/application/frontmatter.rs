//! Front matter extraction.
//!
//! Two header syntaxes are recognised. A `---` fence opens a YAML-like
//! key/value block and a `+++` fence opens a TOML table. Either way the
//! header yields a [`FrontMatter`] and the remainder of the file becomes the
//! document body.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::domain::{
    document::{Document, FrontMatter, ISO_DATE_FORMAT, SourceFile},
    error::DomainError,
};

const YAML_FENCE: &str = "---";
const TOML_FENCE: &str = "+++";

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("document does not start with a `---` or `+++` front matter fence")]
    MissingHeader,
    #[error("front matter opened on line 1 is never closed with `{fence}`")]
    Unterminated { fence: &'static str },
    #[error("malformed front matter on line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("front matter is missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("front matter field `date` is not a valid calendar date: `{value}`")]
    InvalidDate { value: String },
    #[error("front matter field `{field}` has the wrong type: {message}")]
    InvalidField { field: &'static str, message: String },
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl FrontMatterError {
    /// File line the error points at, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            FrontMatterError::Malformed { line, .. } => Some(*line),
            FrontMatterError::MissingHeader | FrontMatterError::Unterminated { .. } => Some(1),
            _ => None,
        }
    }
}

/// Untyped header content shared by both syntaxes before validation.
#[derive(Debug, Default, Deserialize)]
struct RawHeader {
    title: Option<String>,
    description: Option<String>,
    date: Option<toml::Value>,
    banner: Option<String>,
    #[serde(default)]
    tags: Option<RawTags>,
    #[serde(default)]
    draft: Option<bool>,
    #[serde(flatten)]
    extra: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    One(String),
    Many(Vec<String>),
}

impl RawTags {
    fn into_vec(self) -> Vec<String> {
        match self {
            RawTags::One(tag) => vec![tag],
            RawTags::Many(tags) => tags,
        }
    }
}

/// Parse a discovered source file into a [`Document`].
pub fn parse_document(source: &SourceFile) -> Result<Document, FrontMatterError> {
    let text = source.text.strip_prefix('\u{feff}').unwrap_or(&source.text);
    let split = split_header(text)?;

    let raw = match split.fence {
        YAML_FENCE => parse_key_values(&split.header_lines)?,
        _ => parse_toml(&split.header_lines)?,
    };

    let front_matter = validate(raw)?;

    Ok(Document {
        slug: source.slug.clone(),
        source_path: source.path.clone(),
        directory: source.directory.clone(),
        front_matter,
        body: split.body.to_string(),
        body_line_offset: split.body_line_offset,
    })
}

struct HeaderSplit<'a> {
    fence: &'static str,
    /// `(file line number, content)` pairs for the header block.
    header_lines: Vec<(usize, &'a str)>,
    body: &'a str,
    body_line_offset: usize,
}

fn split_header(text: &str) -> Result<HeaderSplit<'_>, FrontMatterError> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next().ok_or(FrontMatterError::MissingHeader)?;
    let fence = match first.trim_end() {
        YAML_FENCE => YAML_FENCE,
        TOML_FENCE => TOML_FENCE,
        _ => return Err(FrontMatterError::MissingHeader),
    };

    let mut consumed = first.len();
    let mut header_lines = Vec::new();
    for (index, line) in lines.enumerate() {
        consumed += line.len();
        let line_number = index + 2;
        if line.trim_end() == fence {
            return Ok(HeaderSplit {
                fence,
                header_lines,
                body: &text[consumed..],
                body_line_offset: line_number,
            });
        }
        header_lines.push((line_number, line.trim_end_matches(['\n', '\r'])));
    }

    Err(FrontMatterError::Unterminated { fence })
}

fn parse_toml(lines: &[(usize, &str)]) -> Result<RawHeader, FrontMatterError> {
    let source = lines
        .iter()
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n");
    let first_line = lines.first().map(|(number, _)| *number).unwrap_or(2);

    toml::from_str::<RawHeader>(&source).map_err(|err| {
        let line = err
            .span()
            .map(|span| first_line + source[..span.start].matches('\n').count())
            .unwrap_or(first_line);
        FrontMatterError::Malformed {
            line,
            message: err.message().to_string(),
        }
    })
}

fn parse_key_values(lines: &[(usize, &str)]) -> Result<RawHeader, FrontMatterError> {
    let mut raw = RawHeader::default();
    let mut pending_list: Option<(usize, String, Vec<String>)> = None;

    for &(line_number, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(item) = trimmed.strip_prefix("- ").or_else(|| (trimmed == "-").then_some(""))
        {
            let Some((_, _, items)) = pending_list.as_mut() else {
                return Err(FrontMatterError::Malformed {
                    line: line_number,
                    message: "list item without a preceding `key:` line".to_string(),
                });
            };
            if line.len() == line.trim_start().len() {
                return Err(FrontMatterError::Malformed {
                    line: line_number,
                    message: "list items must be indented".to_string(),
                });
            }
            items.push(unquote(item.trim(), line_number)?);
            continue;
        }

        if let Some((key_line, key, items)) = pending_list.take() {
            assign(&mut raw, key_line, &key, ScalarOrList::List(items))?;
        }

        let (key, value) = trimmed
            .split_once(':')
            .ok_or_else(|| FrontMatterError::Malformed {
                line: line_number,
                message: format!("expected `key: value`, found `{trimmed}`"),
            })?;
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(FrontMatterError::Malformed {
                line: line_number,
                message: format!("invalid key `{key}`"),
            });
        }

        let value = value.trim();
        if value.is_empty() {
            pending_list = Some((line_number, key.to_string(), Vec::new()));
        } else if let Some(inner) = value.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| FrontMatterError::Malformed {
                    line: line_number,
                    message: "flow list is missing its closing `]`".to_string(),
                })?;
            let items = split_flow_list(inner, line_number)?;
            assign(&mut raw, line_number, key, ScalarOrList::List(items))?;
        } else {
            let scalar = unquote(strip_trailing_comment(value), line_number)?;
            assign(&mut raw, line_number, key, ScalarOrList::Scalar(scalar))?;
        }
    }

    if let Some((key_line, key, items)) = pending_list.take() {
        assign(&mut raw, key_line, &key, ScalarOrList::List(items))?;
    }

    Ok(raw)
}

enum ScalarOrList {
    Scalar(String),
    List(Vec<String>),
}

fn assign(
    raw: &mut RawHeader,
    line: usize,
    key: &str,
    value: ScalarOrList,
) -> Result<(), FrontMatterError> {
    // `key:` with nothing after it and no items is an unset field.
    if let ScalarOrList::List(items) = &value
        && items.is_empty()
        && key != "tags"
    {
        return Ok(());
    }

    let expect_scalar = |value: ScalarOrList| match value {
        ScalarOrList::Scalar(value) => Ok(value),
        ScalarOrList::List(_) => Err(FrontMatterError::Malformed {
            line,
            message: format!("`{key}` expects a single value, not a list"),
        }),
    };

    let already_set = match key {
        "title" => raw.title.is_some(),
        "description" => raw.description.is_some(),
        "date" => raw.date.is_some(),
        "banner" => raw.banner.is_some(),
        "draft" => raw.draft.is_some(),
        "tags" => raw.tags.is_some(),
        other => raw.extra.contains_key(other),
    };
    if already_set {
        return Err(FrontMatterError::Malformed {
            line,
            message: format!("key `{key}` is repeated"),
        });
    }

    match key {
        "title" => raw.title = Some(expect_scalar(value)?),
        "description" => raw.description = Some(expect_scalar(value)?),
        "date" => raw.date = Some(toml::Value::String(expect_scalar(value)?)),
        "banner" => raw.banner = Some(expect_scalar(value)?),
        "draft" => {
            let flag = expect_scalar(value)?;
            raw.draft = Some(match flag.as_str() {
                "true" | "yes" => true,
                "false" | "no" => false,
                other => {
                    return Err(FrontMatterError::Malformed {
                        line,
                        message: format!("`draft` expects true or false, found `{other}`"),
                    });
                }
            });
        }
        "tags" => {
            raw.tags = Some(match value {
                ScalarOrList::Scalar(tag) => RawTags::One(tag),
                ScalarOrList::List(tags) => RawTags::Many(tags),
            })
        }
        other => {
            let stored = match value {
                ScalarOrList::Scalar(value) => toml::Value::String(value),
                ScalarOrList::List(items) => {
                    toml::Value::Array(items.into_iter().map(toml::Value::String).collect())
                }
            };
            raw.extra.insert(other.to_string(), stored);
        }
    }

    Ok(())
}

fn split_flow_list(inner: &str, line: usize) -> Result<Vec<String>, FrontMatterError> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in inner.chars() {
        match (quote, ch) {
            (Some(open), c) if c == open => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, ',') => {
                items.push(std::mem::take(&mut current));
            }
            (None, c) => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(FrontMatterError::Malformed {
            line,
            message: "unterminated quote in flow list".to_string(),
        });
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .map(|item| unquote(&item, line))
        .collect()
}

fn strip_trailing_comment(value: &str) -> &str {
    if value.starts_with('"') || value.starts_with('\'') {
        return value;
    }
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

fn unquote(value: &str, line: usize) -> Result<String, FrontMatterError> {
    let Some(quote) = value.chars().next().filter(|ch| *ch == '"' || *ch == '\'') else {
        return Ok(value.to_string());
    };

    let inner = value[1..]
        .strip_suffix(quote)
        .ok_or_else(|| FrontMatterError::Malformed {
            line,
            message: format!("unterminated quoted value `{value}`"),
        })?;

    if quote == '\'' {
        return Ok(inner.replace("''", "'"));
    }

    let mut unescaped = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some(other @ ('"' | '\\')) => unescaped.push(other),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    Ok(unescaped)
}

fn validate(raw: RawHeader) -> Result<FrontMatter, FrontMatterError> {
    let title = raw
        .title
        .ok_or(FrontMatterError::MissingField { field: "title" })?;
    let date_value = raw
        .date
        .ok_or(FrontMatterError::MissingField { field: "date" })?;
    let date = parse_date(&date_value)?;
    let tags = raw.tags.map(RawTags::into_vec).unwrap_or_default();

    let mut front_matter = FrontMatter::new(
        &title,
        date,
        raw.description.as_deref(),
        raw.banner.as_deref(),
        &tags,
    )?;
    front_matter.draft = raw.draft.unwrap_or(false);
    front_matter.extra = raw
        .extra
        .into_iter()
        .map(|(key, value)| {
            let rendered = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            (key, rendered)
        })
        .collect();

    Ok(front_matter)
}

fn parse_date(value: &toml::Value) -> Result<Date, FrontMatterError> {
    match value {
        toml::Value::String(text) => parse_date_str(text.trim()),
        toml::Value::Datetime(datetime) => {
            let rendered = datetime.to_string();
            match datetime.date {
                Some(_) => parse_date_str(&rendered),
                None => Err(FrontMatterError::InvalidDate { value: rendered }),
            }
        }
        other => Err(FrontMatterError::InvalidField {
            field: "date",
            message: format!("expected a date, found `{other}`"),
        }),
    }
}

fn parse_date_str(text: &str) -> Result<Date, FrontMatterError> {
    if let Ok(date) = Date::parse(text, ISO_DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(timestamp) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(timestamp.date());
    }
    // TOML local date-times (`2021-03-04T10:00:00`) carry no offset; the
    // calendar date is the leading `YYYY-MM-DD`.
    if let Some(prefix) = text.get(..10)
        && text[10..].starts_with(['T', ' '])
        && let Ok(date) = Date::parse(prefix, ISO_DATE_FORMAT)
    {
        return Ok(date);
    }

    Err(FrontMatterError::InvalidDate {
        value: text.to_string(),
    })
}
