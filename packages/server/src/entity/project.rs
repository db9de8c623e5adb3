use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub name: String,

    /// Bytes currently consumed by the project's active file resources.
    pub storage_size: i64,
    /// Storage ceiling in bytes. Immutable as far as the file workflow is
    /// concerned.
    pub max_storage_size: i64,

    /// Optimistic-concurrency token. A storage adjustment must present the
    /// version it read; a stale token affects zero rows.
    pub version: i32,

    #[sea_orm(has_many)]
    pub teams: HasMany<super::team::Entity>,

    #[sea_orm(has_many)]
    pub resources: HasMany<super::resource::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
