use std::fmt;

use serde::{Deserialize, Serialize};

/// Lookup handle for an object in the backend.
///
/// Keys derived from file metadata use the fixed layout
/// `p<projectId>_<byteSize>_<originalFileName>`, which existing stored
/// objects depend on. A key is regenerated on every content change, so the
/// old blob can be removed by its old key after the new metadata is durable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Derive the storage key for a project file.
    pub fn derive(project_id: i64, size: i64, file_name: &str) -> Self {
        Self(format!("p{project_id}_{size}_{file_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ObjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
