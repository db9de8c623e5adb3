use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::instrument;

use trellis_common::retry::{RetryError, retry_on_conflict};
use trellis_common::storage::{ObjectKey, ObjectStore, StoredObject};

use crate::entity::{project, resource};
use crate::models::resource::{ResourceStatus, ResourceType};

use super::error::FileError;
use super::filter::{self, ResourceFilterCriteria};
use super::ledger;
use super::membership;

/// Attempt bound for the optimistic-lock retry loop.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// An uploaded file as handed over by the HTTP layer.
pub struct NewFile<'a> {
    pub name: &'a str,
    pub content_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

/// Orchestrates the file resource workflow.
///
/// Every mutation is a bounded-retry transaction around a version-guarded
/// critical section. The metadata transaction commits before the object
/// backend is touched, so a crash between the two leaves a metadata record
/// whose blob state has not caught up yet; there is no compensating
/// transaction.
pub struct FileService<'a> {
    db: &'a DatabaseConnection,
    objects: &'a dyn ObjectStore,
}

pub fn file_service<'a>(
    db: &'a DatabaseConnection,
    objects: &'a dyn ObjectStore,
) -> FileService<'a> {
    FileService { db, objects }
}

impl FileService<'_> {
    /// Attach a new file to a project.
    #[instrument(skip(self, file), fields(name = %file.name, size = file.bytes.len()))]
    pub async fn upload(
        &self,
        project_id: i64,
        user_id: i64,
        file: &NewFile<'_>,
    ) -> Result<resource::Model, FileError> {
        let size = file.bytes.len() as i64;

        let created = retry_on_conflict(MAX_WRITE_ATTEMPTS, FileError::is_conflict, || {
            self.upload_attempt(project_id, user_id, file.name, file.content_type, size)
        })
        .await
        .map_err(|e| match e {
            RetryError::Aborted(err) => err,
            RetryError::Exhausted { attempts } => FileError::UploadConflict { attempts },
        })?;

        // Metadata is durable; catch the blob store up.
        self.objects
            .put(
                &ObjectKey::from(created.key.as_str()),
                file.bytes,
                file.content_type,
            )
            .await?;

        Ok(created)
    }

    /// Replace a resource's content. The filename must match the stored name;
    /// only the creator may replace content.
    #[instrument(skip(self, file), fields(name = %file.name, size = file.bytes.len()))]
    pub async fn update(
        &self,
        project_id: i64,
        resource_id: i64,
        user_id: i64,
        file: &NewFile<'_>,
    ) -> Result<resource::Model, FileError> {
        let size = file.bytes.len() as i64;

        let (updated, old_key) = retry_on_conflict(MAX_WRITE_ATTEMPTS, FileError::is_conflict, || {
            self.update_attempt(
                project_id,
                resource_id,
                user_id,
                file.name,
                file.content_type,
                size,
            )
        })
        .await
        .map_err(|e| match e {
            RetryError::Aborted(err) => err,
            RetryError::Exhausted { attempts } => FileError::UpdateConflict { attempts },
        })?;

        // The new key is durable in the metadata row, so the old blob can go
        // before the new one lands.
        self.objects.delete(&ObjectKey::from(old_key.as_str())).await?;
        self.objects
            .put(
                &ObjectKey::from(updated.key.as_str()),
                file.bytes,
                file.content_type,
            )
            .await?;

        Ok(updated)
    }

    /// Soft-delete a resource and release its storage reservation.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        project_id: i64,
        resource_id: i64,
        user_id: i64,
    ) -> Result<(), FileError> {
        let key = retry_on_conflict(MAX_WRITE_ATTEMPTS, FileError::is_conflict, || {
            self.delete_attempt(project_id, resource_id, user_id)
        })
        .await
        .map_err(|e| match e {
            RetryError::Aborted(err) => err,
            RetryError::Exhausted { attempts } => FileError::DeleteConflict { attempts },
        })?;

        self.objects.delete(&ObjectKey::from(key.as_str())).await?;
        Ok(())
    }

    /// Fetch a resource's content for a project member.
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        project_id: i64,
        resource_id: i64,
        user_id: i64,
    ) -> Result<(resource::Model, StoredObject), FileError> {
        let current = find_resource(self.db, project_id, resource_id).await?;
        membership::resolve_member(self.db, current.project_id, user_id).await?;

        if current.status == ResourceStatus::Deleted.as_str() {
            return Err(FileError::ResourceNotFound(resource_id));
        }

        let object = self
            .objects
            .get(&ObjectKey::from(current.key.as_str()))
            .await?;
        Ok((current, object))
    }

    /// List a project's resources, narrowed by the applicable filters.
    #[instrument(skip(self, criteria))]
    pub async fn list(
        &self,
        project_id: i64,
        user_id: i64,
        criteria: &ResourceFilterCriteria,
    ) -> Result<Vec<resource::Model>, FileError> {
        find_project(self.db, project_id).await?;
        membership::resolve_member(self.db, project_id, user_id).await?;

        let resources = resource::Entity::find()
            .filter(resource::Column::ProjectId.eq(project_id))
            .order_by_asc(resource::Column::CreatedAt)
            .all(self.db)
            .await?;

        Ok(filter::apply_filters(resources, criteria))
    }

    async fn upload_attempt(
        &self,
        project_id: i64,
        user_id: i64,
        name: &str,
        content_type: Option<&str>,
        size: i64,
    ) -> Result<resource::Model, FileError> {
        let txn = self.db.begin().await?;

        let current_project = find_project(&txn, project_id).await?;
        let member = membership::resolve_member(&txn, project_id, user_id).await?;

        let new_size = reserve_or_fail(&current_project, size)?;

        let key = ObjectKey::derive(project_id, size, name);
        let now = Utc::now();
        let created = resource::ActiveModel {
            key: Set(key.into_string()),
            name: Set(name.to_string()),
            size: Set(size),
            resource_type: Set(ResourceType::from_content_type(content_type).to_string()),
            status: Set(ResourceStatus::Active.to_string()),
            created_by: Set(member.id),
            updated_by: Set(None),
            project_id: Set(project_id),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        save_project_storage(&txn, &current_project, new_size).await?;

        txn.commit().await?;
        Ok(created)
    }

    /// Returns the updated model together with the replaced object key.
    async fn update_attempt(
        &self,
        project_id: i64,
        resource_id: i64,
        user_id: i64,
        name: &str,
        content_type: Option<&str>,
        size: i64,
    ) -> Result<(resource::Model, String), FileError> {
        let txn = self.db.begin().await?;

        let current = find_resource(&txn, project_id, resource_id).await?;
        let member = membership::resolve_member(&txn, current.project_id, user_id).await?;

        if current.name != name {
            return Err(FileError::FilenameMismatch {
                expected: current.name.clone(),
                actual: name.to_string(),
            });
        }
        if current.created_by != member.id {
            return Err(FileError::NotResourceOwner {
                user_id,
                resource_id,
            });
        }
        if current.status == ResourceStatus::Deleted.as_str() {
            return Err(FileError::AlreadyDeleted(resource_id));
        }

        let current_project = find_project(&txn, current.project_id).await?;
        // The old copy's reservation is notionally released before checking
        // the new size against the ceiling.
        let new_size = reserve_or_fail(&current_project, size - current.size)?;

        let key = ObjectKey::derive(current.project_id, size, name);
        let resource_type = ResourceType::from_content_type(content_type).to_string();
        let now = Utc::now();

        let patch = resource::ActiveModel {
            key: Set(key.as_str().to_string()),
            size: Set(size),
            resource_type: Set(resource_type.clone()),
            updated_by: Set(Some(member.id)),
            version: Set(current.version + 1),
            updated_at: Set(now),
            ..Default::default()
        };
        save_resource(&txn, &current, patch).await?;
        save_project_storage(&txn, &current_project, new_size).await?;

        txn.commit().await?;

        let old_key = current.key.clone();
        let updated = resource::Model {
            key: key.into_string(),
            size,
            resource_type,
            updated_by: Some(member.id),
            version: current.version + 1,
            updated_at: now,
            ..current
        };
        Ok((updated, old_key))
    }

    /// Returns the deleted resource's object key for the blob side effect.
    async fn delete_attempt(
        &self,
        project_id: i64,
        resource_id: i64,
        user_id: i64,
    ) -> Result<String, FileError> {
        let txn = self.db.begin().await?;

        let current = find_resource(&txn, project_id, resource_id).await?;
        let member = membership::resolve_member(&txn, current.project_id, user_id).await?;

        if current.created_by != member.id {
            return Err(FileError::NotResourceOwner {
                user_id,
                resource_id,
            });
        }
        if current.status == ResourceStatus::Deleted.as_str() {
            return Err(FileError::AlreadyDeleted(resource_id));
        }

        let current_project = find_project(&txn, current.project_id).await?;

        let patch = resource::ActiveModel {
            status: Set(ResourceStatus::Deleted.to_string()),
            updated_by: Set(Some(member.id)),
            version: Set(current.version + 1),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        save_resource(&txn, &current, patch).await?;
        // Release the deleted content's reservation.
        save_project_storage(
            &txn,
            &current_project,
            current_project.storage_size - current.size,
        )
        .await?;

        txn.commit().await?;
        Ok(current.key)
    }
}

async fn find_project<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<project::Model, FileError> {
    project::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(FileError::ProjectNotFound(id))
}

/// A resource addressed through the wrong project is indistinguishable from
/// a missing one.
async fn find_resource<C: ConnectionTrait>(
    conn: &C,
    project_id: i64,
    id: i64,
) -> Result<resource::Model, FileError> {
    let current = resource::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(FileError::ResourceNotFound(id))?;
    if current.project_id != project_id {
        return Err(FileError::ResourceNotFound(id));
    }
    Ok(current)
}

fn reserve_or_fail(current_project: &project::Model, delta: i64) -> Result<i64, FileError> {
    ledger::reserve(
        current_project.storage_size,
        current_project.max_storage_size,
        delta,
    )
    .map_err(|e| FileError::QuotaExceeded {
        project_id: current_project.id,
        requested: e.requested,
        available: e.available,
    })
}

/// Version-guarded write of the project's storage counter. Zero affected
/// rows means another writer advanced the project row first.
async fn save_project_storage<C: ConnectionTrait>(
    conn: &C,
    current_project: &project::Model,
    new_size: i64,
) -> Result<(), FileError> {
    let patch = project::ActiveModel {
        storage_size: Set(new_size),
        version: Set(current_project.version + 1),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    let result = project::Entity::update_many()
        .set(patch)
        .filter(project::Column::Id.eq(current_project.id))
        .filter(project::Column::Version.eq(current_project.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(FileError::Conflict);
    }
    Ok(())
}

/// Version-guarded resource write keyed on the version read at the start of
/// the critical section.
async fn save_resource<C: ConnectionTrait>(
    conn: &C,
    current: &resource::Model,
    patch: resource::ActiveModel,
) -> Result<(), FileError> {
    let result = resource::Entity::update_many()
        .set(patch)
        .filter(resource::Column::Id.eq(current.id))
        .filter(resource::Column::Version.eq(current.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(FileError::Conflict);
    }
    Ok(())
}
