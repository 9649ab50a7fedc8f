// src/store/local.rs

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::{fs, io::AsyncWriteExt};

use super::{BlobStore, BucketPolicy, BucketStatus, StoreError};

const POLICY_FILE: &str = ".bucket.json";

/// Blob store backed by a directory tree: `<root>/<bucket>/<object path>`.
///
/// The bucket policy is persisted next to the objects and checked on every
/// upload, the same way a hosted object store enforces it server side.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    bucket: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// Resolves an object path, refusing anything that would escape the bucket.
    fn object_path(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean || path.ends_with(POLICY_FILE) {
            return Err(StoreError::Rejected(format!("invalid object path '{}'", path)));
        }
        Ok(self.bucket_dir().join(relative))
    }

    async fn load_policy(&self) -> Result<BucketPolicy, StoreError> {
        let raw = match fs::read(self.bucket_dir().join(POLICY_FILE)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::BucketMissing(self.bucket.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Unavailable(format!("corrupt bucket policy: {}", e)))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_bucket(&self, policy: &BucketPolicy) -> Result<BucketStatus, StoreError> {
        let dir = self.bucket_dir();
        if fs::try_exists(dir.join(POLICY_FILE)).await? {
            return Ok(BucketStatus::AlreadyExists);
        }

        fs::create_dir_all(&dir).await?;
        let body = serde_json::to_vec_pretty(policy)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        fs::write(dir.join(POLICY_FILE), body).await?;

        tracing::info!("Created bucket {} at {}", policy.name, dir.display());
        Ok(BucketStatus::Created)
    }

    async fn upload(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<(), StoreError> {
        let policy = self.load_policy().await?;
        policy.check(content_type, bytes.len())?;

        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::Rejected(format!("object '{}' already exists", path)));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes).await?;
        file.flush().await?;

        tracing::debug!("Stored {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StoreError> {
        for path in paths {
            let target = self.object_path(path)?;
            match fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
