//! Run-scoped directory holding one file per extracted block
//!
//! The directory is removed when the run finishes, or on drop if the run
//! unwinds. [`ArtifactDir::keep`] leaves it on disk for debugging.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use super::error::{CheckError, Result};
use super::types::Block;

const PREFIX: &str = "mermaid-check-";

/// Temporary directory of materialised diagram blocks
#[derive(Debug)]
pub struct ArtifactDir {
    dir: TempDir,
}

impl ArtifactDir {
    /// Create a fresh directory under the system temp location
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir()
            .map_err(|source| CheckError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        debug!(path = %dir.path().display(), "Created artifact directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `block` to the directory and return the file name used
    ///
    /// `document` numbers the source documents of a run so files from
    /// documents with the same name do not collide.
    pub fn write_block(&self, document: usize, source_file: &str, block: &Block) -> Result<String> {
        let stem = Path::new(source_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(sanitize)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string());
        let file_name = format!("{document:03}-{stem}-block-{}.mmd", block.index);
        let path = self.dir.path().join(&file_name);

        fs::write(&path, &block.code).map_err(|source| CheckError::artifact(&path, source))?;
        Ok(file_name)
    }

    /// Leave the directory on disk and return its path
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }

    /// Remove the directory, logging rather than failing on error
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "Failed to remove artifact directory");
        }
    }
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
