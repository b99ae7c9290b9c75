//! Content discovery.
//!
//! Two layouts are recognised under the content directory:
//!
//! - `<slug>/index.md` (or `index.mdx`), with assets next to it;
//! - `<slug>.md` (or `.mdx`) directly in the content directory.
//!
//! Entries whose name starts with `.` or `_` are skipped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::domain::document::SourceFile;

use super::error::InfraError;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdx"];
const INDEX_STEM: &str = "index";

/// Locate and read every document under `root`, sorted by path.
pub fn load_sources(root: &Path) -> Result<Vec<SourceFile>, InfraError> {
    if !root.is_dir() {
        return Err(InfraError::configuration(format!(
            "content directory `{}` does not exist",
            root.display()
        )));
    }

    let mut sources = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(located) = locate(root, entry.path(), entry.depth()) else {
            trace!(
                target = "quire::content",
                path = %entry.path().display(),
                "skipping non-document file"
            );
            continue;
        };

        let text = fs::read_to_string(entry.path())
            .map_err(|err| InfraError::io_at(entry.path(), err))?;
        sources.push(SourceFile {
            path: entry.path().to_path_buf(),
            directory: located.directory,
            slug: located.slug,
            text,
        });
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        target = "quire::content",
        root = %root.display(),
        documents = sources.len(),
        "content directory scanned"
    );
    Ok(sources)
}

/// Read a single document file, deriving its slug the same way discovery does.
pub fn read_source(path: &Path) -> Result<SourceFile, InfraError> {
    let text = fs::read_to_string(path).map_err(|err| InfraError::io_at(path, err))?;
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            InfraError::configuration(format!("`{}` has no usable file name", path.display()))
        })?;
    let directory = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let slug = if stem == INDEX_STEM {
        directory
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(stem)
            .to_string()
    } else {
        stem.to_string()
    };

    Ok(SourceFile {
        path: path.to_path_buf(),
        directory,
        slug,
        text,
    })
}

struct Located {
    slug: String,
    directory: PathBuf,
}

fn locate(root: &Path, path: &Path, depth: usize) -> Option<Located> {
    let extension = path.extension()?.to_str()?;
    if !MARKDOWN_EXTENSIONS.contains(&extension) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;

    match depth {
        1 if stem != INDEX_STEM => Some(Located {
            slug: stem.to_string(),
            directory: root.to_path_buf(),
        }),
        2 if stem == INDEX_STEM => {
            let directory = path.parent()?;
            let slug = directory.file_name()?.to_str()?;
            Some(Located {
                slug: slug.to_string(),
                directory: directory.to_path_buf(),
            })
        }
        _ => None,
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('_'))
}
