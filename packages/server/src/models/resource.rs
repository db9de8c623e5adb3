use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::resource;

/// Lifecycle status of a file resource.
///
/// `Deleted` is terminal: no resource transitions out of it, and a deleted
/// resource's size is excluded from the project's storage accounting for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum ResourceStatus {
    Active,
    Deleted,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Deleted => "Deleted",
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown resource status: {other}")),
        }
    }
}

/// Coarse classification of a resource, derived from the uploaded content's
/// declared media type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum ResourceType {
    Image,
    Video,
    Audio,
    Text,
    Pdf,
    Archive,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Text => "Text",
            Self::Pdf => "Pdf",
            Self::Archive => "Archive",
            Self::Other => "Other",
        }
    }

    /// Classify a media type string. Unknown or missing types map to `Other`.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(ct) = content_type else {
            return Self::Other;
        };
        let ct = ct.trim().to_ascii_lowercase();

        if ct.starts_with("image/") {
            Self::Image
        } else if ct.starts_with("video/") {
            Self::Video
        } else if ct.starts_with("audio/") {
            Self::Audio
        } else if ct.starts_with("text/") {
            Self::Text
        } else if ct == "application/pdf" {
            Self::Pdf
        } else if matches!(
            ct.as_str(),
            "application/zip"
                | "application/gzip"
                | "application/x-tar"
                | "application/x-7z-compressed"
        ) {
            Self::Archive
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Image" => Ok(Self::Image),
            "Video" => Ok(Self::Video),
            "Audio" => Ok(Self::Audio),
            "Text" => Ok(Self::Text),
            "Pdf" => Ok(Self::Pdf),
            "Archive" => Ok(Self::Archive),
            "Other" => Ok(Self::Other),
            other => Err(format!("unknown resource type: {other}")),
        }
    }
}

/// Response DTO for a single file resource.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ResourceResponse {
    pub id: i64,
    /// Object-backend lookup key.
    #[schema(example = "p7_2048_report.pdf")]
    pub key: String,
    /// Original upload filename.
    #[schema(example = "report.pdf")]
    pub name: String,
    /// Content size in bytes.
    #[schema(example = 2048)]
    pub size: i64,
    #[serde(rename = "type")]
    #[schema(example = "Pdf")]
    pub resource_type: String,
    #[schema(example = "Active")]
    pub status: String,
    pub project_id: i64,
    /// Team member that created the resource.
    pub created_by: i64,
    /// Team member that last mutated the resource.
    pub updated_by: Option<i64>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<resource::Model> for ResourceResponse {
    fn from(model: resource::Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            name: model.name,
            size: model.size,
            resource_type: model.resource_type,
            status: model.status,
            project_id: model.project_id,
            created_by: model.created_by,
            updated_by: model.updated_by,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Response DTO for listing resources.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ResourceListResponse {
    pub resources: Vec<ResourceResponse>,
    pub total: u64,
}

/// Query parameters accepted by the resource list endpoint.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ResourceListQuery {
    /// Case-insensitive substring match on the resource name.
    pub name: Option<String>,
    /// Filter by lifecycle status. When absent, only active resources are
    /// returned.
    pub status: Option<String>,
    /// Filter by resource type.
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
}
