//! Media storage
//!
//! Decoded recipe images are written under `<root>/recipes/images/` with a
//! random file name. Stored paths are relative to the media root, which is
//! what the `recipes.image` column holds.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::serializers::DecodedImage;

/// Directory (relative to the media root) recipe images go to
pub const RECIPE_IMAGE_DIR: &str = "recipes/images";

/// Errors from storing an upload
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("The image is larger than {max} bytes.")]
    TooLarge { max: u64 },

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Filesystem storage for uploaded images
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_size: u64,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            root: root.into(),
            max_size,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.root.clone(), config.max_image_size)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an image and return its path relative to the media root
    pub async fn save(&self, image: &DecodedImage) -> Result<String, MediaError> {
        if image.bytes.len() as u64 > self.max_size {
            return Err(MediaError::TooLarge { max: self.max_size });
        }

        let dir = self.root.join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory {}", dir.display()))?;

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), image.extension);
        tokio::fs::write(dir.join(&file_name), &image.bytes)
            .await
            .with_context(|| format!("Failed to write image {}", file_name))?;

        Ok(format!("{}/{}", RECIPE_IMAGE_DIR, file_name))
    }

    /// Delete a stored file; a missing file is not an error
    pub async fn remove(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Absolute path of a stored file, refusing paths that escape the root
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_))
        });
        if escapes {
            anyhow::bail!("Media path {} is outside the media root", relative.display());
        }
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png() -> DecodedImage {
        DecodedImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            extension: "png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(dir.path(), 1024);

        let path = storage.save(&png()).await.unwrap();
        assert!(path.starts_with("recipes/images/"));
        assert!(path.ends_with(".png"));

        let absolute = storage.resolve(&path).unwrap();
        assert_eq!(std::fs::read(&absolute).unwrap(), png().bytes);

        storage.remove(&path).await.unwrap();
        assert!(!absolute.exists());
        // Removing twice is fine
        storage.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(dir.path(), 1024);

        let first = storage.save(&png()).await.unwrap();
        let second = storage.save(&png()).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_size_limit() {
        let dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(dir.path(), 3);

        let err = storage.save(&png()).await.unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { max: 3 }));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let storage = MediaStorage::new("/srv/media", 1024);
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert_eq!(
            storage.resolve("recipes/images/a.png").unwrap(),
            PathBuf::from("/srv/media/recipes/images/a.png")
        );
    }
}
