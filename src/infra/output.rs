//! Output directory writer.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use super::error::InfraError;

/// Writes the generated site under a single root directory. Every relative
/// path handed to it is checked to stay inside that root.
#[derive(Debug, Clone)]
pub struct SiteWriter {
    root: PathBuf,
}

impl SiteWriter {
    /// Create the output directory, removing previous contents first when
    /// `clean` is set. Refuses to clean a directory that contains `protect`
    /// (the content directory).
    pub async fn prepare(root: &Path, clean: bool, protect: &Path) -> Result<Self, InfraError> {
        if clean && fs::try_exists(root).await.map_err(|err| InfraError::io_at(root, err))? {
            let root_abs = fs::canonicalize(root)
                .await
                .map_err(|err| InfraError::io_at(root, err))?;
            if let Ok(protect_abs) = fs::canonicalize(protect).await
                && protect_abs.starts_with(&root_abs)
            {
                return Err(InfraError::configuration(format!(
                    "refusing to clean `{}` because it contains the content directory",
                    root.display()
                )));
            }

            info!(
                target = "quire::output",
                path = %root.display(),
                "cleaning output directory"
            );
            fs::remove_dir_all(root)
                .await
                .map_err(|err| InfraError::io_at(root, err))?;
        }

        fs::create_dir_all(root)
            .await
            .map_err(|err| InfraError::io_at(root, err))?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `contents` to `relative` under the output root, creating parent
    /// directories as needed.
    pub async fn write_file(
        &self,
        relative: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf, InfraError> {
        let target = self.target(relative.as_ref())?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| InfraError::io_at(parent, err))?;
        }
        fs::write(&target, contents)
            .await
            .map_err(|err| InfraError::io_at(&target, err))?;
        debug!(target = "quire::output", path = %target.display(), "wrote file");
        Ok(target)
    }

    /// Write a document page to `<slug>/index.html`.
    pub async fn write_page(&self, slug: &str, html: &str) -> Result<PathBuf, InfraError> {
        self.write_file(Path::new(slug).join("index.html"), html).await
    }

    /// Copy a document asset to `<slug>/<relative>`.
    pub async fn copy_asset(
        &self,
        source: &Path,
        slug: &str,
        relative: &Path,
    ) -> Result<PathBuf, InfraError> {
        let target = self.target(&Path::new(slug).join(relative))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| InfraError::io_at(parent, err))?;
        }
        fs::copy(source, &target)
            .await
            .map_err(|err| InfraError::io_at(source, err))?;
        Ok(target)
    }

    fn target(&self, relative: &Path) -> Result<PathBuf, InfraError> {
        let escapes = relative.components().any(|component| {
            !matches!(component, Component::Normal(_) | Component::CurDir)
        });
        if escapes || relative.as_os_str().is_empty() {
            return Err(InfraError::configuration(format!(
                "output path `{}` must stay inside the output directory",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}
