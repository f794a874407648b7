use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::upload::UploadedFile;

/// Served when a requested image does not exist.
pub const NOT_FOUND_IMAGE: &str = "notfound.jpeg";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist an uploaded image and return the generated file name
    async fn store(&self, file: &UploadedFile) -> ProductResult<String>;

    /// Read a stored image, falling back to [`NOT_FOUND_IMAGE`]
    async fn load(&self, name: &str) -> ProductResult<Bytes>;

    /// Delete a stored image; a name that is already gone is not an error
    async fn remove(&self, name: &str) -> ProductResult<()>;
}

/// Images kept as plain files in one directory
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read(&self, name: &str) -> ProductResult<Bytes> {
        Ok(Bytes::from(tokio::fs::read(self.dir.join(name)).await?))
    }
}

/// Keep the last path component and replace anything unusual with `_`.
fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, file: &UploadedFile) -> ProductResult<String> {
        if !file.is_image() {
            return Err(ProductError::Io("Invalid image format".to_string()));
        }

        let name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(&file.file_name));
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), &file.bytes).await?;

        info!(file = %name, size = file.bytes.len(), "Stored image");
        Ok(name)
    }

    async fn load(&self, name: &str) -> ProductResult<Bytes> {
        if !is_safe_name(name) {
            return Err(ProductError::Io(format!("Invalid image name: {}", name)));
        }

        if tokio::fs::try_exists(self.dir.join(name)).await? {
            return self.read(name).await;
        }

        warn!(file = %name, "Image not found, serving fallback");
        self.read(NOT_FOUND_IMAGE).await
    }

    async fn remove(&self, name: &str) -> ProductResult<()> {
        if !is_safe_name(name) {
            return Err(ProductError::Io(format!("Invalid image name: {}", name)));
        }

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                info!(file = %name, "Removed image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str, bytes: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("photo.png"), "photo.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\pics\\my cat.jpg"), "my_cat.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "image");
    }

    #[tokio::test]
    async fn test_store_keeps_extension_and_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let name = storage
            .store(&upload("shoe.png", "image/png", b"png-bytes"))
            .await
            .unwrap();

        assert!(name.ends_with("_shoe.png"));
        let written = std::fs::read(dir.path().join(&name)).unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[tokio::test]
    async fn test_store_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let err = storage
            .store(&upload("notes.txt", "text/plain", b"hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProductError::Io(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_load_falls_back_to_not_found_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"real").unwrap();
        std::fs::write(dir.path().join(NOT_FOUND_IMAGE), b"placeholder").unwrap();
        let storage = LocalFileStorage::new(dir.path());

        assert_eq!(&storage.load("a.jpg").await.unwrap()[..], b"real");
        assert_eq!(&storage.load("missing.jpg").await.unwrap()[..], b"placeholder");
    }

    #[tokio::test]
    async fn test_load_without_fallback_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        assert!(storage.load("missing.jpg").await.is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        for name in ["../secret.jpg", "a/b.jpg", ".env", ""] {
            assert!(storage.load(name).await.is_err(), "{name} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_remove_deletes_stored_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let name = storage
            .store(&upload("shoe.png", "image/png", b"png-bytes"))
            .await
            .unwrap();

        storage.remove(&name).await.unwrap();
        storage.remove(&name).await.unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(storage.remove("../escape.png").await.is_err());
    }
}
