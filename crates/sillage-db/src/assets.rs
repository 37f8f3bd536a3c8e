//! Asset storage backend for uploaded images.
//!
//! The catalog delegates image hosting to an external asset service; in
//! this deployment that service is a directory served by the reverse
//! proxy. The trait keeps the seam so an S3/CDN backend can be swapped in.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use sillage_core::{Error, Result};

/// Upload categories map to subdirectories of the asset root.
pub const CATEGORY_PARFUMS: &str = "parfums";
pub const CATEGORY_AVATARS: &str = "avatars";

/// Map an upload MIME type to a file extension. Only the accepted image
/// types resolve; anything else is rejected before storage.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Storage backend for uploaded assets.
#[async_trait]
pub trait AssetBackend: Send + Sync {
    /// Persist `data` under the given category, returning the public path
    /// to store on the entity (e.g. `/assets/parfums/<id>.jpg`).
    async fn store(&self, category: &str, extension: &str, data: &[u8]) -> Result<String>;

    /// Delete a previously stored asset by its public path. Missing files
    /// are not an error.
    async fn delete(&self, public_path: &str) -> Result<()>;
}

/// Filesystem-backed asset storage.
pub struct FilesystemAssetBackend {
    base_dir: PathBuf,
    /// Public URL prefix the reverse proxy serves `base_dir` under.
    public_prefix: String,
}

impl FilesystemAssetBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_prefix: "/assets".to_string(),
        }
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup so filesystem problems
    /// (permissions, missing mounts) surface before the first upload.
    pub async fn validate(&self) -> Result<()> {
        let probe_dir = self.base_dir.join(".health-check");
        let probe_file = probe_dir.join("probe.bin");

        fs::create_dir_all(&probe_dir).await?;
        fs::write(&probe_file, b"asset-store-probe").await?;
        let read_back = fs::read(&probe_file).await?;
        if read_back != b"asset-store-probe" {
            return Err(Error::Storage(
                "asset store probe read back different bytes".to_string(),
            ));
        }
        fs::remove_file(&probe_file).await?;
        fs::remove_dir(&probe_dir).await.ok();
        Ok(())
    }

    fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let relative = public_path.strip_prefix(&self.public_prefix)?;
        let relative = relative.trim_start_matches('/');
        // Refuse traversal out of the asset root.
        if Path::new(relative)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        Some(self.base_dir.join(relative))
    }
}

#[async_trait]
impl AssetBackend for FilesystemAssetBackend {
    async fn store(&self, category: &str, extension: &str, data: &[u8]) -> Result<String> {
        let filename = format!("{}.{}", Uuid::now_v7(), extension);
        let dir = self.base_dir.join(category);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(&filename);
        fs::write(&path, data).await?;

        debug!(
            subsystem = "db",
            component = "asset_store",
            op = "store",
            category = category,
            bytes = data.len(),
            "Stored asset"
        );
        Ok(format!("{}/{}/{}", self.public_prefix, category, filename))
    }

    async fn delete(&self, public_path: &str) -> Result<()> {
        let Some(path) = self.resolve(public_path) else {
            return Err(Error::Storage(format!(
                "path '{}' is outside the asset store",
                public_path
            )));
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_mime_accepts_only_images() {
        assert_eq!(extension_for_mime("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_mime("image/png"), Some("png"));
        assert_eq!(extension_for_mime("image/webp"), Some("webp"));
        assert_eq!(extension_for_mime("application/pdf"), None);
        assert_eq!(extension_for_mime("image/svg+xml"), None);
    }

    #[tokio::test]
    async fn test_store_and_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemAssetBackend::new(dir.path());

        backend.validate().await.unwrap();

        let public = backend
            .store(CATEGORY_PARFUMS, "jpg", b"fake-jpeg-bytes")
            .await
            .unwrap();
        assert!(public.starts_with("/assets/parfums/"));
        assert!(public.ends_with(".jpg"));

        let on_disk = backend.resolve(&public).unwrap();
        assert_eq!(fs::read(&on_disk).await.unwrap(), b"fake-jpeg-bytes");

        backend.delete(&public).await.unwrap();
        assert!(!on_disk.exists());
        // Deleting again is a no-op.
        backend.delete(&public).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemAssetBackend::new(dir.path());
        assert!(backend.delete("/assets/../etc/passwd").await.is_err());
        assert!(backend.delete("/elsewhere/file.jpg").await.is_err());
    }
}
