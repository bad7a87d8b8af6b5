//! Storage for uploaded originals.
//!
//! Files are written flat into the uploads directory under their
//! (sanitised) original name. A new upload is first staged as a hidden
//! partial file and only replaces a same-named original once it has been
//! indexed, so a failed re-upload leaves the earlier file in place. The
//! listing reads the directory, not the index, and skips staged files.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::RagError;

const PARTIAL_PREFIX: &str = ".partial.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
}

pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reduce a client-supplied name to a bare file name.
    ///
    /// Directory components are stripped so uploads cannot escape the
    /// uploads directory.
    pub fn sanitize(filename: &str) -> Result<String, RagError> {
        let normalized = filename.replace('\\', "/");
        let name = normalized
            .rsplit('/')
            .next()
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() || name == "." || name == ".." || name.starts_with(PARTIAL_PREFIX) {
            return Err(RagError::Upload(format!("invalid file name '{}'", filename)));
        }
        Ok(name.to_string())
    }

    /// Path a sanitised name would be stored at.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Staging path for `name`. Keeps the extension so format dispatch
    /// still works on it.
    pub fn partial_path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", PARTIAL_PREFIX, name))
    }

    /// Write `bytes` to the staging path. Nothing visible changes until
    /// [`commit`](Self::commit).
    pub async fn stage(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, RagError> {
        let path = self.partial_path_for(name);
        self.write(&path, bytes).await?;
        Ok(path)
    }

    /// Move a staged file over the final path for `name`.
    pub async fn commit(&self, staged: &Path, name: &str) -> Result<PathBuf, RagError> {
        let path = self.path_for(name);
        tokio::fs::rename(staged, &path).await.map_err(|e| {
            RagError::Upload(format!(
                "failed to move {} to {}: {}",
                staged.display(),
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "committed upload");
        Ok(path)
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), RagError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RagError::Upload(format!("failed to create {}: {}", self.dir.display(), e)))?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| RagError::Upload(format!("failed to write {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved upload");
        Ok(())
    }

    /// Best-effort removal. A file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "failed to remove upload: {}", e),
        }
    }

    /// Uploaded files sorted by name. A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<FileEntry>, RagError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| RagError::Upload(format!("failed to list uploads: {}", e)))?;
            if !entry.file_type().is_file()
                || entry.file_name().to_string_lossy().starts_with(PARTIAL_PREFIX)
            {
                continue;
            }
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_string_lossy().into_owned(),
            });
        }
        Ok(entries)
    }
}
