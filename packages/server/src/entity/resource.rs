use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A file attached to a project. Deletion is soft: the row stays with status
/// `Deleted` and only the blob is removed from the object backend.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resource")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Object-backend lookup handle (`p<projectId>_<size>_<name>`).
    /// Regenerated on every content change.
    pub key: String,

    /// Display name of the original file.
    pub name: String,

    /// Byte count of the current content.
    pub size: i64,

    /// One of: Image, Video, Audio, Text, Pdf, Archive, Other.
    pub resource_type: String,

    /// One of: Active, Deleted. Deleted is terminal.
    pub status: String,

    /// Team member who created the resource.
    pub created_by: i64,
    /// Team member who last mutated the resource.
    pub updated_by: Option<i64>,

    pub project_id: i64,
    #[sea_orm(belongs_to, from = "project_id", to = "id")]
    pub project: HasOne<super::project::Entity>,

    /// Optimistic-concurrency token, incremented on every successful persist.
    pub version: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
