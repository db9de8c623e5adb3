use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;
use super::key::ObjectKey;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// An object fetched from the backend.
pub struct StoredObject {
    pub reader: BoxReader,
    pub content_type: Option<String>,
    /// Byte length of the content.
    pub size: u64,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("reader", &"<BoxReader>")
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish()
    }
}

/// Key-addressed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous object.
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Fetch the object stored under `key`.
    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError>;

    /// Delete the object stored under `key`.
    ///
    /// Idempotent: returns `true` if an object was deleted, `false` if no
    /// object existed under the key. Deleting a missing key is not an error.
    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError>;
}
