//! Utilities for generating deterministic, human-friendly slugs.
//!
//! The helpers here bridge ASCII slugification (`slug` crate) with Chinese
//! transliteration (`pinyin` crate) so inputs like “基线对齐” become
//! `ji-xian-dui-qi`. Document slugs and heading anchors both flow through
//! [`derive_slug`].

use std::collections::{HashMap, HashSet};

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Returns `true` when `value` is already in canonical slug form, i.e.
/// slugifying it again yields the same string.
pub fn is_canonical(value: &str) -> bool {
    derive_slug(value).is_ok_and(|derived| derived == value)
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Headings processed in order will receive monotonic suffixes when duplicates
/// occur (e.g. `section`, `section-2`, `section-3`). A suffix never
/// collides with a slug already handed out, even one derived from heading
/// text that itself ends in a number.
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
    emitted: HashSet<String>,
}

impl AnchorSlugger {
    /// Create a new slugger instance.
    pub fn new() -> Self {
        Self {
            occurrences: HashMap::new(),
            emitted: HashSet::new(),
        }
    }

    /// Generate a slug for the provided heading text, ensuring uniqueness
    /// within this slugger. Returns an error when the heading cannot produce a
    /// slug (empty or unrepresentable input).
    pub fn anchor_for(&mut self, heading: &str) -> Result<String, SlugError> {
        let base = derive_slug(heading)?;
        let count = self.occurrences.entry(base.clone()).or_insert(0);

        let candidate = loop {
            *count += 1;
            let candidate = if *count == 1 {
                base.clone()
            } else {
                format!("{base}-{}", *count)
            };
            if !self.emitted.contains(&candidate) {
                break candidate;
            }
        };

        self.emitted.insert(candidate.clone());
        Ok(candidate)
    }
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => {
                // Preserve unhandled characters so slugify can decide how to filter them.
                output.push(ch);
            }
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_transliterates_chinese() {
        let slug = derive_slug("Rust 基础教程").expect("slug");
        assert_eq!(slug, "rust-ji-chu-jiao-cheng");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn canonical_slugs_are_detected() {
        assert!(is_canonical("redux-to-zustand"));
        assert!(!is_canonical("Redux To Zustand"));
        assert!(!is_canonical(""));
    }

    #[test]
    fn anchor_slugger_produces_unique_slugs() {
        let mut slugger = AnchorSlugger::new();

        let first = slugger.anchor_for("Overview").expect("slug");
        let second = slugger.anchor_for("Overview").expect("slug");
        let third = slugger.anchor_for("深入理解").expect("slug");

        assert_eq!(first, "overview");
        assert_eq!(second, "overview-2");
        assert_eq!(third, "shen-ru-li-jie");
    }

    #[test]
    fn anchor_suffixes_skip_slugs_already_taken() {
        let mut slugger = AnchorSlugger::new();
        let anchors: Vec<_> = ["Setup", "Setup", "Setup 2", "Setup 2", "Setup"]
            .into_iter()
            .map(|heading| slugger.anchor_for(heading).expect("slug"))
            .collect();

        assert_eq!(anchors, vec!["setup", "setup-2", "setup-2-2", "setup-2-3", "setup-3"]);
    }
}
