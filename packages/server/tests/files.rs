//! End-to-end tests for the file resource workflow against an in-memory
//! SQLite database and a tempdir-backed object store.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use tokio::io::AsyncReadExt;

use trellis_common::storage::filesystem::FilesystemObjectStore;
use trellis_common::storage::{ObjectKey, ObjectStore};
use trellis_server::entity::{project, resource, team, team_member};
use trellis_server::files::filter::ResourceFilterCriteria;
use trellis_server::files::{FileError, NewFile, file_service};
use trellis_server::models::resource::{ResourceStatus, ResourceType};

const CREATOR: i64 = 10;
const OTHER_MEMBER: i64 = 11;
const OUTSIDER: i64 = 99;

async fn test_db() -> DatabaseConnection {
    // A pool of one connection keeps every query on the same in-memory
    // database.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite");
    db.get_schema_registry("trellis_server::entity::*")
        .sync(&db)
        .await
        .expect("sync schema");
    db
}

async fn temp_store() -> (FilesystemObjectStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = FilesystemObjectStore::new(dir.path().join("objects"))
        .await
        .unwrap();
    (store, dir)
}

/// Seed a project with one team holding `CREATOR` and `OTHER_MEMBER`.
async fn seed_project(db: &DatabaseConnection, storage_size: i64, max_storage_size: i64) -> i64 {
    let now = Utc::now();
    let proj = project::ActiveModel {
        name: Set("Apollo".into()),
        storage_size: Set(storage_size),
        max_storage_size: Set(max_storage_size),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let team_row = team::ActiveModel {
        name: Set("Core".into()),
        project_id: Set(proj.id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    for user_id in [CREATOR, OTHER_MEMBER] {
        team_member::ActiveModel {
            team_id: Set(team_row.id),
            user_id: Set(user_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    proj.id
}

async fn project_row(db: &DatabaseConnection, id: i64) -> project::Model {
    project::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
}

async fn resource_row(db: &DatabaseConnection, id: i64) -> resource::Model {
    resource::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
}

async fn read_all(store: &FilesystemObjectStore, key: &str) -> Vec<u8> {
    let object = store.get(&ObjectKey::from(key)).await.unwrap();
    let mut reader = object.reader;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.unwrap();
    buf
}

fn pdf<'a>(name: &'a str, bytes: &'a [u8]) -> NewFile<'a> {
    NewFile {
        name,
        content_type: Some("application/pdf"),
        bytes,
    }
}

#[tokio::test]
async fn upload_accounts_storage_and_stores_blob() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    assert_eq!(created.size, 9);
    assert_eq!(created.key, format!("p{project_id}_9_report.pdf"));
    assert_eq!(created.status, ResourceStatus::Active.as_str());
    assert_eq!(created.resource_type, ResourceType::Pdf.as_str());
    assert_eq!(created.version, 1);
    assert_eq!(created.updated_by, None);

    let proj = project_row(&db, project_id).await;
    assert_eq!(proj.storage_size, 9);
    assert_eq!(proj.version, 2);

    assert!(
        store
            .exists(&ObjectKey::from(created.key.as_str()))
            .await
            .unwrap()
    );
    assert_eq!(read_all(&store, &created.key).await, b"hello pdf");
}

#[tokio::test]
async fn sequential_uploads_accumulate_storage() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    for (name, bytes) in [
        ("a.txt", b"aaaa".as_slice()),
        ("b.txt", b"bbbbbb".as_slice()),
        ("c.txt", b"cc".as_slice()),
    ] {
        service
            .upload(
                project_id,
                CREATOR,
                &NewFile {
                    name,
                    content_type: Some("text/plain"),
                    bytes,
                },
            )
            .await
            .unwrap();
    }

    let proj = project_row(&db, project_id).await;
    assert_eq!(proj.storage_size, 12);
    // One version bump per successful storage adjustment.
    assert_eq!(proj.version, 4);
}

#[tokio::test]
async fn upload_rejects_outsider_before_any_effect() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    // Quota is already full: membership must still be the failure reported.
    let project_id = seed_project(&db, 1000, 1000).await;
    let service = file_service(&db, &store);

    let err = service
        .upload(project_id, OUTSIDER, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FileError::NotProjectMember {
            user_id: OUTSIDER,
            ..
        }
    ));

    let proj = project_row(&db, project_id).await;
    assert_eq!(proj.storage_size, 1000);
    assert_eq!(proj.version, 1);
    assert!(resource::Entity::find().all(&db).await.unwrap().is_empty());
    assert!(
        !store
            .exists(&ObjectKey::derive(project_id, 9, "report.pdf"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn upload_enforces_quota_ceiling() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 900, 1000).await;
    let service = file_service(&db, &store);

    let big = vec![0u8; 150];
    let err = service
        .upload(
            project_id,
            CREATOR,
            &NewFile {
                name: "big.bin",
                content_type: None,
                bytes: &big,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FileError::QuotaExceeded {
            requested: 150,
            available: 100,
            ..
        }
    ));
    assert_eq!(project_row(&db, project_id).await.storage_size, 900);

    let fits = vec![0u8; 100];
    service
        .upload(
            project_id,
            CREATOR,
            &NewFile {
                name: "fits.bin",
                content_type: None,
                bytes: &fits,
            },
        )
        .await
        .unwrap();
    assert_eq!(project_row(&db, project_id).await.storage_size, 1000);
}

#[tokio::test]
async fn update_regenerates_key_and_replaces_storage() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    let replacement = vec![7u8; 25];
    let updated = service
        .update(
            project_id,
            created.id,
            CREATOR,
            &pdf("report.pdf", &replacement),
        )
        .await
        .unwrap();

    assert_ne!(updated.key, created.key);
    assert_eq!(updated.key, format!("p{project_id}_25_report.pdf"));
    assert_eq!(updated.size, 25);
    assert_eq!(updated.version, 2);
    assert!(updated.updated_by.is_some());

    // The returned model matches what was persisted.
    let row = resource_row(&db, created.id).await;
    assert_eq!(row.key, updated.key);
    assert_eq!(row.size, 25);
    assert_eq!(row.version, 2);

    let proj = project_row(&db, project_id).await;
    assert_eq!(proj.storage_size, 25);
    assert_eq!(proj.version, 3);

    // Old blob removed, new one in place.
    assert!(
        !store
            .exists(&ObjectKey::from(created.key.as_str()))
            .await
            .unwrap()
    );
    assert_eq!(read_all(&store, &updated.key).await, replacement);
}

#[tokio::test]
async fn update_checks_quota_against_released_capacity() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 100).await;
    let service = file_service(&db, &store);

    let original = vec![1u8; 80];
    let created = service
        .upload(project_id, CREATOR, &pdf("data.pdf", &original))
        .await
        .unwrap();

    // 90 bytes would not fit next to the old copy, but replaces it.
    let grown = vec![2u8; 90];
    service
        .update(project_id, created.id, CREATOR, &pdf("data.pdf", &grown))
        .await
        .unwrap();
    assert_eq!(project_row(&db, project_id).await.storage_size, 90);

    // 120 bytes exceeds the ceiling even with the old copy released.
    let too_big = vec![3u8; 120];
    let err = service
        .update(project_id, created.id, CREATOR, &pdf("data.pdf", &too_big))
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::QuotaExceeded { .. }));
}

#[tokio::test]
async fn update_rejects_renamed_file() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    let err = service
        .update(project_id, created.id, CREATOR, &pdf("renamed.pdf", b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::FilenameMismatch { .. }));

    // Nothing changed.
    assert_eq!(resource_row(&db, created.id).await.key, created.key);
    assert_eq!(project_row(&db, project_id).await.storage_size, 9);
}

#[tokio::test]
async fn update_rejects_non_creator() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    let err = service
        .update(project_id, created.id, OTHER_MEMBER, &pdf("report.pdf", b"y"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FileError::NotResourceOwner {
            user_id: OTHER_MEMBER,
            ..
        }
    ));
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let err = service
        .update(project_id, 4242, CREATOR, &pdf("report.pdf", b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::ResourceNotFound(4242)));

    let err = service.delete(project_id, 4242, CREATOR).await.unwrap_err();
    assert!(matches!(err, FileError::ResourceNotFound(4242)));
}

#[tokio::test]
async fn resource_is_invisible_through_wrong_project() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let other_project = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    let err = service
        .delete(other_project, created.id, CREATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::ResourceNotFound(_)));

    let err = service
        .download(other_project, created.id, CREATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::ResourceNotFound(_)));
}

#[tokio::test]
async fn delete_releases_storage_and_is_terminal() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    service.delete(project_id, created.id, CREATOR).await.unwrap();

    // Soft delete: the row stays, the reservation and the blob are gone.
    let row = resource_row(&db, created.id).await;
    assert_eq!(row.status, ResourceStatus::Deleted.as_str());
    assert_eq!(row.version, 2);
    assert!(row.updated_by.is_some());

    let proj = project_row(&db, project_id).await;
    assert_eq!(proj.storage_size, 0);
    assert_eq!(proj.version, 3);

    assert!(
        !store
            .exists(&ObjectKey::from(created.key.as_str()))
            .await
            .unwrap()
    );

    // Deleted is terminal.
    let err = service
        .delete(project_id, created.id, CREATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::AlreadyDeleted(_)));

    let err = service
        .update(project_id, created.id, CREATOR, &pdf("report.pdf", b"z"))
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::AlreadyDeleted(_)));
}

#[tokio::test]
async fn delete_rejects_non_creator() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    let err = service
        .delete(project_id, created.id, OTHER_MEMBER)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::NotResourceOwner { .. }));
    assert_eq!(
        resource_row(&db, created.id).await.status,
        ResourceStatus::Active.as_str()
    );
}

#[tokio::test]
async fn download_round_trips_content() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    // Any project member may download, not just the creator.
    let (model, object) = service
        .download(project_id, created.id, OTHER_MEMBER)
        .await
        .unwrap();
    assert_eq!(model.id, created.id);
    assert_eq!(object.size, 9);
    assert_eq!(object.content_type.as_deref(), Some("application/pdf"));

    let mut reader = object.reader;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.unwrap();
    assert_eq!(buf, b"hello pdf");

    let err = service
        .download(project_id, created.id, OUTSIDER)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::NotProjectMember { .. }));
}

#[tokio::test]
async fn deleted_resource_is_not_downloadable() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();
    service.delete(project_id, created.id, CREATOR).await.unwrap();

    let err = service
        .download(project_id, created.id, CREATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::ResourceNotFound(_)));
}

#[tokio::test]
async fn stale_version_token_writes_nothing() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let created = service
        .upload(project_id, CREATOR, &pdf("report.pdf", b"hello pdf"))
        .await
        .unwrap();

    // A concurrent writer advances the row first.
    let winner = resource::Entity::update_many()
        .set(resource::ActiveModel {
            version: Set(created.version + 1),
            ..Default::default()
        })
        .filter(resource::Column::Id.eq(created.id))
        .filter(resource::Column::Version.eq(created.version))
        .exec(&db)
        .await
        .unwrap();
    assert_eq!(winner.rows_affected, 1);

    // The same token presented again is stale and affects no rows.
    let loser = resource::Entity::update_many()
        .set(resource::ActiveModel {
            size: Set(1),
            ..Default::default()
        })
        .filter(resource::Column::Id.eq(created.id))
        .filter(resource::Column::Version.eq(created.version))
        .exec(&db)
        .await
        .unwrap();
    assert_eq!(loser.rows_affected, 0);
    assert_eq!(resource_row(&db, created.id).await.size, 9);
}

#[tokio::test]
async fn list_applies_filters() {
    let db = test_db().await;
    let (store, _dir) = temp_store().await;
    let project_id = seed_project(&db, 0, 1000).await;
    let service = file_service(&db, &store);

    let files: [(&str, Option<&str>, &[u8]); 3] = [
        ("report.pdf", Some("application/pdf"), b"hello pdf"),
        ("photo.png", Some("image/png"), b"png bytes"),
        ("notes.txt", Some("text/plain"), b"notes"),
    ];
    let mut ids = Vec::new();
    for (name, content_type, bytes) in files {
        let created = service
            .upload(
                project_id,
                CREATOR,
                &NewFile {
                    name,
                    content_type,
                    bytes,
                },
            )
            .await
            .unwrap();
        ids.push(created.id);
    }
    service.delete(project_id, ids[2], CREATOR).await.unwrap();

    let names = |resources: Vec<resource::Model>| {
        let mut names: Vec<String> = resources.into_iter().map(|r| r.name).collect();
        names.sort();
        names
    };

    // Default: active only.
    let active = service
        .list(project_id, CREATOR, &ResourceFilterCriteria::default())
        .await
        .unwrap();
    assert_eq!(names(active), ["photo.png", "report.pdf"]);

    // Explicit status.
    let deleted = service
        .list(
            project_id,
            CREATOR,
            &ResourceFilterCriteria {
                status: Some(ResourceStatus::Deleted),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(names(deleted), ["notes.txt"]);

    // Name + type narrow further.
    let images = service
        .list(
            project_id,
            CREATOR,
            &ResourceFilterCriteria {
                resource_type: Some(ResourceType::Image),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(names(images), ["photo.png"]);

    let err = service
        .list(project_id, OUTSIDER, &ResourceFilterCriteria::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::NotProjectMember { .. }));
}
