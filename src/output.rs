//! Serialization and persistence of published artifacts.
//!
//! Artifacts are stored minified; the bytes written are the bytes hashed by
//! [`crate::tracker`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

/// One serialized collection, ready to be written under
/// `<data_dir>/<category>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub category: String,
    pub file: String,
    pub records: usize,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn from_collection<T: Serialize>(category: &str, file: &str, items: &[T]) -> Result<Self> {
        Ok(Self {
            category: category.to_string(),
            file: file.to_string(),
            records: items.len(),
            bytes: serde_json::to_vec(items)?,
        })
    }

    pub fn path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.category).join(&self.file)
    }

    pub fn write(&self, data_dir: &Path) -> Result<PathBuf> {
        self.stage(data_dir)?.commit()
    }

    /// Writes the bytes next to the published path without replacing it.
    ///
    /// Fails without touching anything when the published path is a
    /// directory.
    pub fn stage(&self, data_dir: &Path) -> Result<Staged> {
        let path = self.path(data_dir);
        if path.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            )
            .into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&path);
        std::fs::write(&tmp, &self.bytes)?;
        Ok(Staged { tmp, path })
    }
}

/// An artifact written to its temp file, waiting to be renamed into place.
#[derive(Debug)]
pub struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

impl Staged {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn commit(self) -> Result<PathBuf> {
        std::fs::rename(&self.tmp, &self.path)?;
        debug!(path = %self.path.display(), "Published file");
        Ok(self.path)
    }

    pub fn discard(self) {
        let _ = std::fs::remove_file(&self.tmp);
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Writes `bytes` to `path`, creating parent directories.
///
/// The content goes to a sibling temp file first and is renamed into place,
/// so readers never see a half-written artifact.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}
