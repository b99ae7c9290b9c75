//! Named widgets embedded in document bodies.
//!
//! Widgets use a JSX-like tag syntax whose name starts with an uppercase
//! ASCII letter, e.g. `<Attribution name="Jane Doe" url="https://…" />`.
//! Markdown hands such tags through as raw HTML; [`scan`] splits a raw
//! fragment into plain text and validated [`Widget`]s.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WidgetError {
    #[error("malformed widget tag `{fragment}`: {message}")]
    Syntax { fragment: String, message: String },
    #[error("unknown widget `<{name}>`")]
    Unknown { name: String },
    #[error("widget `<{widget}>` requires the `{attribute}` attribute")]
    MissingAttribute {
        widget: WidgetKind,
        attribute: &'static str,
    },
    #[error("widget `<{widget}>` has an invalid `{attribute}` attribute: {message}")]
    InvalidAttribute {
        widget: WidgetKind,
        attribute: String,
        message: String,
    },
    #[error("widget `<{widget}>` must be self-closing")]
    NotSelfClosing { widget: WidgetKind },
    #[error("widget `<{widget}>` cannot be self-closing")]
    SelfClosing { widget: WidgetKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WidgetKind {
    Comments,
    Attribution,
    Callout,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Comments => "Comments",
            WidgetKind::Attribution => "Attribution",
            WidgetKind::Callout => "Callout",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Comments" => Some(WidgetKind::Comments),
            "Attribution" => Some(WidgetKind::Attribution),
            "Callout" => Some(WidgetKind::Callout),
            _ => None,
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalloutVariant {
    #[default]
    Note,
    Tip,
    Warning,
    Danger,
}

impl CalloutVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalloutVariant::Note => "note",
            CalloutVariant::Tip => "tip",
            CalloutVariant::Warning => "warning",
            CalloutVariant::Danger => "danger",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CalloutVariant::Note => "Note",
            CalloutVariant::Tip => "Tip",
            CalloutVariant::Warning => "Warning",
            CalloutVariant::Danger => "Danger",
        }
    }
}

impl FromStr for CalloutVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "note" | "info" => Ok(CalloutVariant::Note),
            "tip" => Ok(CalloutVariant::Tip),
            "warning" | "warn" => Ok(CalloutVariant::Warning),
            "danger" | "error" => Ok(CalloutVariant::Danger),
            other => Err(format!(
                "`{other}` is not one of note, tip, warning, danger"
            )),
        }
    }
}

/// A validated widget occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    Comments {
        term: Option<String>,
    },
    Attribution {
        name: String,
        url: String,
        source: Option<String>,
    },
    CalloutOpen {
        variant: CalloutVariant,
        title: Option<String>,
    },
    CalloutClose,
}

impl Widget {
    pub fn kind(&self) -> WidgetKind {
        match self {
            Widget::Comments { .. } => WidgetKind::Comments,
            Widget::Attribution { .. } => WidgetKind::Attribution,
            Widget::CalloutOpen { .. } | Widget::CalloutClose => WidgetKind::Callout,
        }
    }

    fn from_tag(tag: RawTag) -> Result<Self, WidgetError> {
        let kind = WidgetKind::from_name(&tag.name).ok_or_else(|| WidgetError::Unknown {
            name: tag.name.clone(),
        })?;

        match kind {
            WidgetKind::Comments | WidgetKind::Attribution if tag.closing => {
                Err(WidgetError::NotSelfClosing { widget: kind })
            }
            WidgetKind::Comments | WidgetKind::Attribution if !tag.self_closing => {
                Err(WidgetError::NotSelfClosing { widget: kind })
            }
            WidgetKind::Comments => {
                tag.reject_unknown(kind, &["term"])?;
                Ok(Widget::Comments {
                    term: tag.optional_text(kind, "term")?,
                })
            }
            WidgetKind::Attribution => {
                tag.reject_unknown(kind, &["name", "url", "source"])?;
                let name = tag
                    .optional_text(kind, "name")?
                    .ok_or(WidgetError::MissingAttribute {
                        widget: kind,
                        attribute: "name",
                    })?;
                let url = tag
                    .optional_text(kind, "url")?
                    .ok_or(WidgetError::MissingAttribute {
                        widget: kind,
                        attribute: "url",
                    })?;
                let parsed = Url::parse(&url).map_err(|err| WidgetError::InvalidAttribute {
                    widget: kind,
                    attribute: "url".to_string(),
                    message: err.to_string(),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(WidgetError::InvalidAttribute {
                        widget: kind,
                        attribute: "url".to_string(),
                        message: format!("scheme `{}` is not http(s)", parsed.scheme()),
                    });
                }
                Ok(Widget::Attribution {
                    name,
                    url,
                    source: tag.optional_text(kind, "source")?,
                })
            }
            WidgetKind::Callout if tag.closing => Ok(Widget::CalloutClose),
            WidgetKind::Callout if tag.self_closing => {
                Err(WidgetError::SelfClosing { widget: kind })
            }
            WidgetKind::Callout => {
                tag.reject_unknown(kind, &["type", "title"])?;
                let variant = match tag.optional_text(kind, "type")? {
                    Some(raw) => raw.parse::<CalloutVariant>().map_err(|message| {
                        WidgetError::InvalidAttribute {
                            widget: kind,
                            attribute: "type".to_string(),
                            message,
                        }
                    })?,
                    None => CalloutVariant::default(),
                };
                Ok(Widget::CalloutOpen {
                    variant,
                    title: tag.optional_text(kind, "title")?,
                })
            }
        }
    }
}

/// Piece of a raw HTML fragment after widget scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Widget(Widget),
}

/// Returns `true` when the fragment contains something shaped like a
/// widget tag (`<Name` or `</Name`).
pub fn contains_widget(fragment: &str) -> bool {
    let bytes = fragment.as_bytes();
    bytes.iter().enumerate().any(|(idx, &byte)| {
        byte == b'<' && widget_name_start(bytes, idx + 1).is_some()
    })
}

fn widget_name_start(bytes: &[u8], mut idx: usize) -> Option<usize> {
    if bytes.get(idx) == Some(&b'/') {
        idx += 1;
    }
    bytes
        .get(idx)
        .filter(|byte| byte.is_ascii_uppercase())
        .map(|_| idx)
}

/// Split a raw HTML fragment into text and widgets.
pub fn scan(fragment: &str) -> Result<Vec<Segment<'_>>, WidgetError> {
    let bytes = fragment.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0usize;
    let mut idx = 0usize;

    while idx < bytes.len() {
        if bytes[idx] == b'<' && widget_name_start(bytes, idx + 1).is_some() {
            let end = find_tag_end(fragment, idx)?;
            if text_start < idx {
                segments.push(Segment::Text(&fragment[text_start..idx]));
            }
            let tag = RawTag::parse(&fragment[idx..=end])?;
            segments.push(Segment::Widget(Widget::from_tag(tag)?));
            idx = end + 1;
            text_start = idx;
        } else {
            idx += 1;
        }
    }

    if text_start < bytes.len() {
        segments.push(Segment::Text(&fragment[text_start..]));
    }

    Ok(segments)
}

fn find_tag_end(fragment: &str, start: usize) -> Result<usize, WidgetError> {
    let mut quote: Option<u8> = None;
    for (offset, &byte) in fragment.as_bytes()[start..].iter().enumerate() {
        match (quote, byte) {
            (Some(open), b) if b == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'>') => return Ok(start + offset),
            (None, _) => {}
        }
    }

    Err(WidgetError::Syntax {
        fragment: fragment[start..].trim_end().to_string(),
        message: "tag is never closed with `>`".to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeValue {
    Text(String),
    Flag,
}

#[derive(Debug)]
struct RawTag {
    name: String,
    attributes: BTreeMap<String, AttributeValue>,
    closing: bool,
    self_closing: bool,
}

impl RawTag {
    fn parse(source: &str) -> Result<Self, WidgetError> {
        let syntax = |message: &str| WidgetError::Syntax {
            fragment: source.to_string(),
            message: message.to_string(),
        };

        let inner = source
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(|| syntax("expected `<…>`"))?;
        let (closing, inner) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let (self_closing, inner) = match inner.trim_end().strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };

        let name_len = inner
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'))
            .unwrap_or(inner.len());
        let name = &inner[..name_len];
        if name.is_empty() {
            return Err(syntax("missing tag name"));
        }

        let attributes = parse_attributes(&inner[name_len..]).map_err(|msg| syntax(&msg))?;
        if closing && (self_closing || !attributes.is_empty()) {
            return Err(syntax("closing tags take no attributes"));
        }

        Ok(Self {
            name: name.to_string(),
            attributes,
            closing,
            self_closing,
        })
    }

    fn reject_unknown(&self, widget: WidgetKind, allowed: &[&str]) -> Result<(), WidgetError> {
        match self
            .attributes
            .keys()
            .find(|key| !allowed.contains(&key.as_str()))
        {
            Some(key) => Err(WidgetError::InvalidAttribute {
                widget,
                attribute: key.clone(),
                message: "unsupported attribute".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn optional_text(
        &self,
        widget: WidgetKind,
        attribute: &'static str,
    ) -> Result<Option<String>, WidgetError> {
        match self.attributes.get(attribute) {
            None => Ok(None),
            Some(AttributeValue::Flag) => Err(WidgetError::InvalidAttribute {
                widget,
                attribute: attribute.to_string(),
                message: "expected a quoted value".to_string(),
            }),
            Some(AttributeValue::Text(value)) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(WidgetError::InvalidAttribute {
                        widget,
                        attribute: attribute.to_string(),
                        message: "value must not be blank".to_string(),
                    })
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
        }
    }
}

fn parse_attributes(input: &str) -> Result<BTreeMap<String, AttributeValue>, String> {
    let mut attributes = BTreeMap::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let key_len = rest
            .find(|ch: char| ch.is_whitespace() || ch == '=')
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        if key.is_empty() || !key.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(format!("invalid attribute name near `{rest}`"));
        }
        rest = rest[key_len..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let quote = after_eq
                .chars()
                .next()
                .filter(|ch| *ch == '"' || *ch == '\'')
                .ok_or_else(|| format!("attribute `{key}` must use a quoted value"))?;
            let body = &after_eq[1..];
            let close = body
                .find(quote)
                .ok_or_else(|| format!("attribute `{key}` has an unterminated value"))?;
            rest = body[close + 1..].trim_start();
            AttributeValue::Text(body[..close].to_string())
        } else {
            AttributeValue::Flag
        };

        if attributes.insert(key.to_string(), value).is_some() {
            return Err(format!("attribute `{key}` is repeated"));
        }
    }

    Ok(attributes)
}
