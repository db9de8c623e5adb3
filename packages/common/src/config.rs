use serde::Deserialize;

/// Object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Storage backend: "filesystem" or "s3". Default: "filesystem".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Root directory for the filesystem backend. Default: "./data/objects".
    #[serde(default = "default_root")]
    pub root: String,
    /// Bucket name for the s3 backend.
    #[serde(default)]
    pub bucket: String,
    /// Region for the s3 backend. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for the s3 backend (MinIO and friends).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Maximum accepted object size in bytes. Default: 128 MB.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
}

fn default_backend() -> String {
    "filesystem".into()
}
fn default_root() -> String {
    "./data/objects".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_max_object_size() -> u64 {
    128 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_root(),
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            max_object_size: default_max_object_size(),
        }
    }
}
