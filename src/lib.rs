//! quire: a static publishing pipeline for long-form articles.
//!
//! Documents are markdown files with a key/value front matter header. The
//! pipeline parses the header, renders the body through comrak with
//! embedded widgets spliced in, lints the corpus for dangling references
//! and writes a static site.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
