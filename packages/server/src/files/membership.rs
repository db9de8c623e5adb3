//! Project membership resolution.
//!
//! An actor is authorized for a project when any of the project's teams lists
//! their user ID. Membership is expected unique per project, so the first
//! match wins.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entity::{team, team_member};

use super::error::FileError;

/// A team together with its member rows.
pub type TeamRoster = (team::Model, Vec<team_member::Model>);

/// Load every team of a project with its members.
pub async fn load_roster<C: ConnectionTrait>(
    conn: &C,
    project_id: i64,
) -> Result<Vec<TeamRoster>, sea_orm::DbErr> {
    team::Entity::find()
        .filter(team::Column::ProjectId.eq(project_id))
        .find_with_related(team_member::Entity)
        .all(conn)
        .await
}

/// Scan the roster for the given user.
pub fn find_member(roster: &[TeamRoster], user_id: i64) -> Option<&team_member::Model> {
    roster
        .iter()
        .flat_map(|(_, members)| members)
        .find(|member| member.user_id == user_id)
}

/// Resolve the acting user's membership on a project, or fail.
pub async fn resolve_member<C: ConnectionTrait>(
    conn: &C,
    project_id: i64,
    user_id: i64,
) -> Result<team_member::Model, FileError> {
    let roster = load_roster(conn, project_id).await?;
    find_member(&roster, user_id)
        .cloned()
        .ok_or(FileError::NotProjectMember {
            user_id,
            project_id,
        })
}
