use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{ObjectStore, StoredObject};

/// Filesystem-backed key-addressed object store.
///
/// Objects live under `{root}/objects/{key}` with the content type persisted
/// in a `{key}.meta` sidecar. Writes are staged in `{root}/.tmp` and moved
/// into place with a rename.
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    pub async fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(root.join("objects")).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &ObjectKey) -> PathBuf {
        self.root.join("objects").join(key.as_str())
    }

    fn meta_path(&self, key: &ObjectKey) -> PathBuf {
        self.root
            .join("objects")
            .join(format!("{}.meta", key.as_str()))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root.join(".tmp").join(uuid::Uuid::new_v4().to_string())
    }

    /// Keys become file names, so path separators and traversal are refused.
    fn check_key(key: &ObjectKey) -> Result<(), StorageError> {
        let raw = key.as_str();
        if raw.is_empty()
            || raw.contains('/')
            || raw.contains('\\')
            || raw.contains('\0')
            || raw == "."
            || raw == ".."
        {
            return Err(StorageError::Rejected(format!(
                "key is not a valid object name: {raw:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        Self::check_key(key)?;

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, self.object_path(key)).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        match content_type {
            Some(ct) => fs::write(self.meta_path(key), ct).await?,
            None => {
                // Stale sidecar from a previous object under the same key.
                let _ = fs::remove_file(self.meta_path(key)).await;
            }
        }

        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        Self::check_key(key)?;

        let path = self.object_path(key);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata().await?.len();
        let content_type = match fs::read_to_string(self.meta_path(key)).await {
            Ok(ct) => Some(ct),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(StoredObject {
            reader: Box::new(BufReader::new(file)),
            content_type,
            size,
        })
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        Self::check_key(key)?;

        let _ = fs::remove_file(self.meta_path(key)).await;
        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        Self::check_key(key)?;
        Ok(fs::try_exists(self.object_path(key)).await?)
    }
}
