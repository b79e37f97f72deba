use crate::error::{Result, TransformError};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;

/// Object-storage collaborator.
///
/// Constructor-injected so the batch router can be exercised in tests
/// without a live S3 endpoint.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetch `bucket`/`key` into `dest`. Fails with a transfer error if the
    /// object is missing or inaccessible.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;

    /// Store the file at `src` as `bucket`/`key`.
    async fn upload(&self, src: &Path, bucket: &str, key: &str) -> Result<()>;
}

pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| TransformError::Transfer {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| TransformError::Transfer {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tokio::fs::write(dest, data.into_bytes()).await?;
        Ok(())
    }

    async fn upload(&self, src: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| TransformError::Transfer {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| TransformError::Transfer {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }
}

/// In-memory storage double for tests.
#[derive(Default)]
pub struct MemoryStorage {
    objects: std::sync::Mutex<std::collections::HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let data = self
            .get(bucket, key)
            .ok_or_else(|| TransformError::Transfer {
                key: key.to_string(),
                message: format!("no such object in bucket '{bucket}'"),
            })?;
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn upload(&self, src: &Path, bucket: &str, key: &str) -> Result<()> {
        let data = tokio::fs::read(src).await?;
        self.put(bucket, key, data);
        Ok(())
    }
}
