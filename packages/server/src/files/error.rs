use sea_orm::DbErr;
use thiserror::Error;

use trellis_common::storage::StorageError;

/// Failures of the file resource workflow.
///
/// Validation failures are deterministic and propagate immediately.
/// [`FileError::Conflict`] is the only retryable error: it marks a stale
/// version token, is consumed by the retry loop and never reaches callers —
/// after the attempt bound it surfaces as the operation-specific
/// `*Conflict { attempts }` variant instead.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("user {user_id} is not on project {project_id}")]
    NotProjectMember { user_id: i64, project_id: i64 },

    #[error("user {user_id} did not create resource {resource_id} and may not change it")]
    NotResourceOwner { user_id: i64, resource_id: i64 },

    #[error(
        "project {project_id} storage has not enough space: \
         {requested} bytes requested, {available} free"
    )]
    QuotaExceeded {
        project_id: i64,
        requested: i64,
        available: i64,
    },

    /// A version-guarded write lost the race against a concurrent writer.
    #[error("stale version token")]
    Conflict,

    #[error("could not upload due to concurrent modifications after {attempts} retries")]
    UploadConflict { attempts: u32 },

    #[error("could not update due to concurrent modifications after {attempts} retries")]
    UpdateConflict { attempts: u32 },

    #[error("could not delete due to concurrent modifications after {attempts} retries")]
    DeleteConflict { attempts: u32 },

    #[error("project {0} not found")]
    ProjectNotFound(i64),

    #[error("resource {0} not found")]
    ResourceNotFound(i64),

    #[error("resource {0} is already deleted")]
    AlreadyDeleted(i64),

    #[error("uploaded file '{actual}' does not match resource name '{expected}': updates replace content, not names")]
    FilenameMismatch { expected: String, actual: String },

    #[error(transparent)]
    Db(#[from] DbErr),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl FileError {
    /// True for the internal stale-token error the retry loop consumes.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}
