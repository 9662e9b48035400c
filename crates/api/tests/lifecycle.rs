//! Transaction and blob-area behaviour of the lifecycle operations,
//! including failures injected through the blob store.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use assert_matches::assert_matches;
use async_trait::async_trait;
use sqlx::PgPool;
use stagetrack_api::error::AppError;
use stagetrack_api::form::Submission;
use stagetrack_api::lifecycle;
use stagetrack_api::storage::{BlobStore, LocalBlobStore, RemovalBatch, StorageError};
use stagetrack_core::error::CoreError;
use stagetrack_core::fields::FormFields;
use stagetrack_core::stage::StageKind;
use stagetrack_core::upload::AllowedExtensions;
use stagetrack_db::repositories::{AttachmentRepo, ProjectRepo, StageRepo};

/// Local store that can be told to fail parking or writes.
struct FlakyBlobStore {
    inner: LocalBlobStore,
    fail_park: bool,
    /// Number of `put` calls that succeed before every later one fails.
    puts_before_failure: Option<usize>,
    puts: AtomicUsize,
}

impl FlakyBlobStore {
    fn new(inner: LocalBlobStore) -> Self {
        Self {
            inner,
            fail_park: false,
            puts_before_failure: None,
            puts: AtomicUsize::new(0),
        }
    }

    fn injected(key: &str) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source: std::io::Error::other("injected failure"),
        }
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let done = self.puts.fetch_add(1, Ordering::SeqCst);
        if self.puts_before_failure.is_some_and(|limit| done >= limit) {
            return Err(Self::injected(key));
        }
        self.inner.put(key, bytes).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.get(key).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }

    async fn park(&self, keys: &[String]) -> Result<RemovalBatch, StorageError> {
        if self.fail_park {
            return Err(Self::injected("park"));
        }
        self.inner.park(keys).await
    }

    async fn restore(&self, batch: RemovalBatch) -> Result<(), StorageError> {
        self.inner.restore(batch).await
    }

    async fn purge(&self, batch: RemovalBatch) -> Result<(), StorageError> {
        self.inner.purge(batch).await
    }
}

fn fields(pairs: &[(&str, &str)]) -> FormFields {
    pairs
        .iter()
        .copied()
        .chain([("creator_name", "Ana Silva"), ("project_name", "Desk Lamp")])
        .collect()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_park_leaves_project_intact(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalBlobStore::new(dir.path());
    let allowed = AllowedExtensions::default();

    let submission = Submission::new(fields(&[("design_cost", "10"), ("modeling_cost", "20")]))
        .with_upload(StageKind::Design, "front.png", &b"front"[..])
        .with_upload(StageKind::Design, "back.png", &b"back"[..])
        .with_upload(StageKind::Modeling, "mesh.txt", &b"mesh"[..]);
    let created = lifecycle::create_project(&pool, &local, &allowed, &submission)
        .await
        .unwrap();
    let id = created.detail.project.id;
    assert_eq!(created.detail.attachments.len(), 3);

    let mut flaky = FlakyBlobStore::new(local.clone());
    flaky.fail_park = true;
    let err = lifecycle::delete_project(&pool, &flaky, id).await.unwrap_err();
    assert_matches!(err, AppError::Storage(StorageError::Io { .. }));

    let mut conn = pool.acquire().await.unwrap();
    let detail = lifecycle::load_detail(&mut conn, id).await.unwrap();
    assert_eq!(detail, created.detail);
    for attachment in &detail.attachments {
        assert!(local.get(&attachment.file_path).await.is_ok());
    }

    // The real store then deletes everything.
    let summary = lifecycle::delete_project(&pool, &local, id).await.unwrap();
    assert_eq!(summary.attachments, 3);
    assert_eq!(summary.blobs, 3);
    assert_eq!(summary.stage_records, 13);
    for attachment in &detail.attachments {
        assert_matches!(
            local.get(&attachment.file_path).await,
            Err(StorageError::NotFound(_))
        );
    }
    assert!(ProjectRepo::find_by_id(&pool, id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_upload_removes_blobs_already_written(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let mut flaky = FlakyBlobStore::new(LocalBlobStore::new(dir.path()));
    flaky.puts_before_failure = Some(1);

    let submission = Submission::new(fields(&[]))
        .with_upload(StageKind::Design, "first.pdf", &b"one"[..])
        .with_upload(StageKind::Design, "second.pdf", &b"two"[..]);
    let err = lifecycle::create_project(&pool, &flaky, &AllowedExtensions::default(), &submission)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Storage(_));

    assert!(ProjectRepo::list(&pool).await.unwrap().is_empty());
    let leftovers = common::stored_files(dir.path());
    assert!(leftovers.is_empty(), "blobs left behind: {leftovers:?}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_field_names_the_form_key(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalBlobStore::new(dir.path());

    let submission = Submission::new(fields(&[("design_cost", "abc")]));
    let err = lifecycle::create_project(&pool, &local, &AllowedExtensions::default(), &submission)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppError::Core(CoreError::InvalidField { ref field, .. }) if field == "design_cost"
    );
    assert!(ProjectRepo::list(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn disallowed_upload_is_skipped_without_error(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalBlobStore::new(dir.path());
    let allowed = AllowedExtensions::parse("pdf");

    let submission = Submission::new(fields(&[]))
        .with_upload(StageKind::Design, "report.pdf", &b"pdf"[..])
        .with_upload(StageKind::Design, "photo.png", &b"png"[..]);
    let outcome = lifecycle::create_project(&pool, &local, &allowed, &submission)
        .await
        .unwrap();

    assert_eq!(outcome.skipped_files, vec!["photo.png".to_string()]);
    let design = outcome.detail.stage(StageKind::Design).unwrap();
    let linked = AttachmentRepo::list_by_stage(&pool, StageKind::Design, design.id)
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].file_type.as_deref(), Some("pdf"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sync_stage_respects_one_record_per_project(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalBlobStore::new(dir.path());
    let outcome = lifecycle::create_project(
        &pool,
        &local,
        &AllowedExtensions::default(),
        &Submission::new(fields(&[])),
    )
    .await
    .unwrap();
    let id = outcome.detail.project.id;

    let mut tx = pool.begin().await.unwrap();
    let edit = fields(&[("tooling_num_tools", "4")]);
    let first = lifecycle::sync_stage(&mut tx, id, StageKind::Tooling, &edit).await.unwrap();
    let second = lifecycle::sync_stage(&mut tx, id, StageKind::Tooling, &edit).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first, second);
    let stored = StageRepo::find_by_project(&pool, StageKind::Tooling, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, outcome.detail.stage(StageKind::Tooling).unwrap().id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn skipped_upload_leaves_removed_stage_absent(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalBlobStore::new(dir.path());
    let allowed = AllowedExtensions::default();
    let created = lifecycle::create_project(&pool, &local, &allowed, &Submission::new(fields(&[])))
        .await
        .unwrap();
    let id = created.detail.project.id;
    sqlx::query("DELETE FROM freight WHERE project_id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let submission = Submission::new(fields(&[]))
        .with_upload(StageKind::Freight, "virus.exe", &b"MZ"[..]);
    let outcome = lifecycle::edit_project(&pool, &local, &allowed, id, &submission)
        .await
        .unwrap();

    assert_eq!(outcome.skipped_files, vec!["virus.exe".to_string()]);
    assert!(outcome.detail.stage(StageKind::Freight).is_none());
    assert!(StageRepo::find_by_project(&pool, StageKind::Freight, id)
        .await
        .unwrap()
        .is_none());
}
