use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

/// Storage seam for uploaded file bytes. The content store references files
/// through the stored names this trait hands back; it never owns the bytes.
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    async fn save(&self, stored_name: &str, bytes: Vec<u8>) -> Result<()>;

    async fn read(&self, stored_name: &str) -> Result<Vec<u8>>;

    async fn remove(&self, stored_name: &str) -> Result<()>;

    async fn exists(&self, stored_name: &str) -> bool;
}

/// Flat uploads directory on the local filesystem. Stored names are bare
/// file names produced by the intake sanitizer, so a plain join stays inside
/// the root.
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create upload directory {}", self.root.display()))
    }

    fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }
}

#[async_trait]
impl FileStorage for DiskStorage {
    async fn save(&self, stored_name: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(stored_name);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write upload {}", path.display()))
    }

    async fn read(&self, stored_name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(stored_name);
        fs::read(&path)
            .await
            .with_context(|| format!("failed to read upload {}", path.display()))
    }

    async fn remove(&self, stored_name: &str) -> Result<()> {
        let path = self.path_for(stored_name);
        fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to remove upload {}", path.display()))
    }

    async fn exists(&self, stored_name: &str) -> bool {
        fs::try_exists(self.path_for(stored_name))
            .await
            .unwrap_or(false)
    }
}
