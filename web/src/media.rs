//! Filesystem-backed media store.

use async_trait::async_trait;
use cakepicnic_core::error::{PortalError, Result};
use cakepicnic_core::store::MediaStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Deletes uploaded cake media from a local directory.
///
/// Media URLs are resolved by their final path segment only, so a stored
/// URL can never escape the media root.
pub struct FilesystemMediaStore {
    root: PathBuf,
}

impl FilesystemMediaStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, media_url: &str) -> Option<PathBuf> {
        let name = media_url.rsplit('/').next()?;
        let name = Path::new(name).file_name()?;
        Some(self.root.join(name))
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn delete(&self, media_url: &str) -> Result<()> {
        let Some(path) = self.resolve(media_url) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted media file");
                Ok(())
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortalError::Database(format!(
                "failed to delete media {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deletes_by_final_segment_only() {
        let dir = std::env::temp_dir().join(format!("media-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let file = dir.join("cake.jpg");
        tokio::fs::write(&file, b"jpeg").await.unwrap();

        let store = FilesystemMediaStore::new(&dir);
        store
            .delete("https://cdn.example.com/uploads/cake.jpg")
            .await
            .unwrap();
        assert!(!file.exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_ok() {
        let store = FilesystemMediaStore::new(std::env::temp_dir());
        store.delete("/uploads/never-existed.png").await.unwrap();
    }
}
