pub mod project;
pub mod resource;
pub mod team;
pub mod team_member;
