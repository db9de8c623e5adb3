use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use trellis_common::storage::StoredObject;

use crate::entity::resource;
use crate::error::{AppError, ErrorBody};
use crate::extractors::actor::ActorId;
use crate::files::filter::ResourceFilterCriteria;
use crate::files::{NewFile, file_service};
use crate::models::resource::{
    ResourceListQuery, ResourceListResponse, ResourceResponse, ResourceStatus, ResourceType,
};
use crate::state::AppState;
use crate::utils::filename::validate_filename;

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024) // 128 MB
}

/// A fully-read multipart file upload.
struct UploadedFile {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl UploadedFile {
    fn as_new_file(&self) -> NewFile<'_> {
        NewFile {
            name: &self.name,
            content_type: self.content_type.as_deref(),
            bytes: &self.bytes,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/resources",
    tag = "Project Resources",
    operation_id = "uploadResource",
    summary = "Upload a file to a project",
    description = "Attaches a file to a project. The `file` multipart field is required and must \
        carry a filename. The acting user must be a member of one of the project's teams and the \
        file must fit into the project's remaining storage quota.",
    params(("id" = i64, Path, description = "Project ID")),
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "Resource created", body = ResourceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (ACTOR_MISSING, ACTOR_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a project member (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Lost too many concurrent-write races (CONFLICT)", body = ErrorBody),
        (status = 413, description = "Storage quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart), fields(user_id = actor.0))]
pub async fn upload_resource(
    actor: ActorId,
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let file = read_file_field(multipart, state.config.storage.max_object_size).await?;

    let created = file_service(&state.db, &*state.objects)
        .upload(project_id, actor.0, &file.as_new_file())
        .await?;

    Ok((StatusCode::CREATED, Json(ResourceResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}/resources/{resource_id}",
    tag = "Project Resources",
    operation_id = "updateResource",
    summary = "Replace a resource's content",
    description = "Uploads new content for an existing resource. The filename must match the \
        stored resource name (content replace, not rename) and only the member that created the \
        resource may replace it. The storage key is regenerated and the old blob removed.",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("resource_id" = i64, Path, description = "Resource ID"),
    ),
    request_body(content_type = "multipart/form-data", description = "Replacement file upload"),
    responses(
        (status = 200, description = "Resource updated", body = ResourceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (ACTOR_MISSING, ACTOR_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a member or not the creator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Resource not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Lost too many concurrent-write races (CONFLICT)", body = ErrorBody),
        (status = 410, description = "Resource already deleted (RESOURCE_DELETED)", body = ErrorBody),
        (status = 413, description = "Storage quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart), fields(user_id = actor.0))]
pub async fn update_resource(
    actor: ActorId,
    State(state): State<AppState>,
    Path((project_id, resource_id)): Path<(i64, i64)>,
    multipart: Multipart,
) -> Result<Json<ResourceResponse>, AppError> {
    let file = read_file_field(multipart, state.config.storage.max_object_size).await?;

    let updated = file_service(&state.db, &*state.objects)
        .update(project_id, resource_id, actor.0, &file.as_new_file())
        .await?;

    Ok(Json(ResourceResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}/resources/{resource_id}",
    tag = "Project Resources",
    operation_id = "deleteResource",
    summary = "Delete a resource",
    description = "Soft-deletes a resource: the metadata row is kept with status Deleted, the \
        project's storage reservation is released and the blob is removed from the object \
        backend. Only the member that created the resource may delete it.",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("resource_id" = i64, Path, description = "Resource ID"),
    ),
    responses(
        (status = 204, description = "Resource deleted"),
        (status = 401, description = "Unauthorized (ACTOR_MISSING, ACTOR_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a member or not the creator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Resource not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Lost too many concurrent-write races (CONFLICT)", body = ErrorBody),
        (status = 410, description = "Resource already deleted (RESOURCE_DELETED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(user_id = actor.0))]
pub async fn delete_resource(
    actor: ActorId,
    State(state): State<AppState>,
    Path((project_id, resource_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    file_service(&state.db, &*state.objects)
        .delete(project_id, resource_id, actor.0)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/resources/{resource_id}",
    tag = "Project Resources",
    operation_id = "downloadResource",
    summary = "Download a resource",
    description = "Streams the resource content. Supports ETag-based caching via If-None-Match; \
        the ETag is derived from the storage key, which changes with every content update.",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("resource_id" = i64, Path, description = "Resource ID"),
    ),
    responses(
        (status = 200, description = "Resource content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 401, description = "Unauthorized (ACTOR_MISSING, ACTOR_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a project member (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Resource not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers), fields(user_id = actor.0))]
pub async fn download_resource(
    actor: ActorId,
    State(state): State<AppState>,
    Path((project_id, resource_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let etag_hit = |model: &resource::Model| {
        let etag = format!("\"{}\"", model.key);
        headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|val| val == etag || val == "*")
    };

    let (model, object) = file_service(&state.db, &*state.objects)
        .download(project_id, resource_id, actor.0)
        .await?;

    if etag_hit(&model) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    build_download_response(&model, object)
}

#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/resources",
    tag = "Project Resources",
    operation_id = "listResources",
    summary = "List a project's resources",
    description = "Returns the project's resources narrowed by the applicable filters. Without a \
        status filter only active resources are shown.",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ResourceListQuery,
    ),
    responses(
        (status = 200, description = "Resource list", body = ResourceListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (ACTOR_MISSING, ACTOR_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a project member (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(user_id = actor.0))]
pub async fn list_resources(
    actor: ActorId,
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(query): Query<ResourceListQuery>,
) -> Result<Json<ResourceListResponse>, AppError> {
    let criteria = parse_criteria(query)?;

    let resources = file_service(&state.db, &*state.objects)
        .list(project_id, actor.0, &criteria)
        .await?;

    let total = resources.len() as u64;
    let resources = resources.into_iter().map(ResourceResponse::from).collect();

    Ok(Json(ResourceListResponse { resources, total }))
}

fn parse_criteria(query: ResourceListQuery) -> Result<ResourceFilterCriteria, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ResourceStatus>)
        .transpose()
        .map_err(AppError::Validation)?;
    let resource_type = query
        .resource_type
        .as_deref()
        .map(str::parse::<ResourceType>)
        .transpose()
        .map_err(AppError::Validation)?;

    Ok(ResourceFilterCriteria {
        name: query.name,
        status,
        resource_type,
    })
}

/// Read the `file` multipart field into memory, enforcing the size cap.
async fn read_file_field(mut multipart: Multipart, max_size: u64) -> Result<UploadedFile, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
        let file_name = validate_filename(&file_name)
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();

        let content_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| mime_guess::from_path(&file_name).first().map(|m| m.to_string()));

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            if (bytes.len() + chunk.len()) as u64 > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            name: file_name,
            content_type,
            bytes,
        });
    }

    Err(AppError::Validation("Missing 'file' field".into()))
}

/// Build a streaming response for a fetched resource.
fn build_download_response(
    model: &resource::Model,
    object: StoredObject,
) -> Result<Response, AppError> {
    let content_type = object
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream")
        .to_string();

    let stream = ReaderStream::new(object.reader);
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, object.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&model.name),
        )
        .header(header::ETAG, format!("\"{}\"", model.key))
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
