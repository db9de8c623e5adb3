use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's registered association with a project team. Membership is
/// expected unique per project; resource audit columns reference this row.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team_member")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub team_id: i64,
    #[sea_orm(belongs_to, from = "team_id", to = "id")]
    pub team: HasOne<super::team::Entity>,

    /// Platform-wide user ID of the member.
    pub user_id: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
