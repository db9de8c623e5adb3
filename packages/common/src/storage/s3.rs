use std::io::Cursor;

use async_trait::async_trait;
use s3::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;

use crate::config::StorageConfig;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{ObjectStore, StoredObject};

/// S3-backed key-addressed object store.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

impl S3ObjectStore {
    pub fn new(bucket: Box<Bucket>) -> Self {
        Self { bucket }
    }

    /// Build a store from the storage configuration, reading credentials from
    /// the environment.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", config.region));
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint,
        };
        let credentials = Credentials::default()
            .map_err(|e| StorageError::Rejected(format!("S3 credentials: {e}")))?;
        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
            .with_path_style();
        Ok(Self { bucket })
    }

    fn map_error(key: &ObjectKey, err: S3Error) -> StorageError {
        match err {
            S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
            S3Error::HttpFailWithBody(code, body) => {
                StorageError::Rejected(format!("status {code}: {body}"))
            }
            other => StorageError::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let result = match content_type {
            Some(ct) => {
                self.bucket
                    .put_object_with_content_type(key.as_str(), bytes, ct)
                    .await
            }
            None => self.bucket.put_object(key.as_str(), bytes).await,
        };
        result.map_err(|e| Self::map_error(key, e))?;
        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let response = self
            .bucket
            .get_object(key.as_str())
            .await
            .map_err(|e| Self::map_error(key, e))?;

        let content_type = response.headers().get("content-type").cloned();
        let bytes = response.bytes().to_vec();
        let size = bytes.len() as u64;

        Ok(StoredObject {
            reader: Box::new(Cursor::new(bytes)),
            content_type,
            size,
        })
    }

    /// S3 deletes are already idempotent: removing a missing key succeeds, so
    /// this cannot distinguish "deleted" from "was never there".
    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        self.bucket
            .delete_object(key.as_str())
            .await
            .map_err(|e| Self::map_error(key, e))?;
        Ok(true)
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        match self.bucket.head_object(key.as_str()).await {
            Ok(_) => Ok(true),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(Self::map_error(key, e)),
        }
    }
}
