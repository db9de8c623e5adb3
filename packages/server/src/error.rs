use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use trellis_common::storage::StorageError;

use crate::files::FileError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `ACTOR_MISSING`, `ACTOR_INVALID`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `CONFLICT`, `QUOTA_EXCEEDED`, `RESOURCE_DELETED`, `INTERNAL_ERROR`.
    #[schema(example = "QUOTA_EXCEEDED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "project 7 storage has not enough space")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// The `x-user-id` header is absent.
    ActorMissing,
    /// The `x-user-id` header is not a valid user ID.
    ActorInvalid,
    PermissionDenied(String),
    NotFound(String),
    /// The operation kept losing optimistic-lock races. Retryable by the
    /// caller.
    Conflict(String),
    QuotaExceeded(String),
    /// The resource was soft-deleted earlier; deletion is terminal.
    ResourceDeleted(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::ActorMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "ACTOR_MISSING",
                    message: "Acting user required".into(),
                },
            ),
            AppError::ActorInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "ACTOR_INVALID",
                    message: "Acting user ID is not valid".into(),
                },
            ),
            AppError::PermissionDenied(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::QuotaExceeded(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "QUOTA_EXCEEDED",
                    message: msg,
                },
            ),
            AppError::ResourceDeleted(msg) => (
                StatusCode::GONE,
                ErrorBody {
                    code: "RESOURCE_DELETED",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                AppError::NotFound(format!("File content not found for key {key}"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotProjectMember { .. } | FileError::NotResourceOwner { .. } => {
                AppError::PermissionDenied(err.to_string())
            }
            FileError::QuotaExceeded { .. } => AppError::QuotaExceeded(err.to_string()),
            FileError::UploadConflict { .. }
            | FileError::UpdateConflict { .. }
            | FileError::DeleteConflict { .. } => AppError::Conflict(err.to_string()),
            FileError::ProjectNotFound(_) | FileError::ResourceNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            FileError::AlreadyDeleted(_) => AppError::ResourceDeleted(err.to_string()),
            FileError::FilenameMismatch { .. } => AppError::Validation(err.to_string()),
            // The retry loop consumes conflicts; one escaping is a bug.
            FileError::Conflict => AppError::Internal("unhandled write conflict".into()),
            FileError::Db(e) => AppError::Internal(e.to_string()),
            FileError::Storage(e) => e.into(),
        }
    }
}
