//! Screenshots kept in a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{ScreenshotStore, StoreError};

/// Writes screenshots into a directory that the HTTP surface serves under
/// `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    directory: PathBuf,
    url_prefix: String,
}

impl LocalStore {
    /// Create a store writing into `directory`.
    pub fn new(directory: impl AsRef<Path>, url_prefix: &str) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// The directory screenshots are written to.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl ScreenshotStore for LocalStore {
    async fn persist(&self, payload: Vec<u8>, file_name: &str) -> Result<String, StoreError> {
        let path = self.directory.join(file_name);
        let write_error = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(write_error)?;
        tokio::fs::write(&path, &payload)
            .await
            .map_err(write_error)?;
        info!(path = %path.display(), bytes = payload.len(), "stored screenshot");
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }
}
