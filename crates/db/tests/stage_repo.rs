//! Integration tests for the project, stage and attachment repositories.
//!
//! Exercises the repository layer against a real database:
//! - Stage upsert (lazy create, overwrite, idempotent re-submit)
//! - One-record-per-stage uniqueness
//! - Uniform cascade delete
//! - Attachment linkage

use assert_matches::assert_matches;
use sqlx::PgPool;
use stagetrack_core::fields::FieldValue;
use stagetrack_core::stage::{ProjectStage, StageKind};
use stagetrack_core::types::Date;
use stagetrack_db::models::attachment::CreateAttachment;
use stagetrack_db::models::project::ProjectInput;
use stagetrack_db::repositories::{AttachmentRepo, ProjectRepo, StageRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_project(name: &str) -> ProjectInput {
    ProjectInput {
        creator_name: "Ana".to_string(),
        project_name: name.to_string(),
        current_stage: ProjectStage::Concept,
        first_contact_date: None,
        first_response_date: None,
        last_contact_date: None,
        last_response_date: None,
        primary_communication_method: None,
    }
}

fn design_values(cost: Option<f64>, artist: Option<&str>) -> Vec<FieldValue> {
    vec![
        FieldValue::Date(Date::from_ymd_opt(2024, 2, 1)),
        FieldValue::Date(None),
        FieldValue::Float(cost),
        FieldValue::Text(artist.map(str::to_string)),
    ]
}

fn new_attachment(project_id: i64, stage_id: i64, path: &str) -> CreateAttachment {
    CreateAttachment {
        project_id,
        stage_kind: StageKind::Design,
        stage_id,
        filename: "report.pdf".to_string(),
        file_path: path.to_string(),
        file_type: Some("pdf".to_string()),
        size_bytes: 12,
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_find_project(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    assert_eq!(project.current_stage, ProjectStage::Concept);

    let found = ProjectRepo::find_by_id(&pool, project.id).await.unwrap();
    assert_eq!(found, Some(project));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_project_allows_any_stage_jump(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();

    let mut input = new_project("Lamp");
    input.current_stage = ProjectStage::Launched;
    let mut conn = pool.acquire().await.unwrap();
    let updated = ProjectRepo::update(&mut conn, project.id, &input)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.current_stage, ProjectStage::Launched);

    input.current_stage = ProjectStage::Design;
    let updated = ProjectRepo::update(&mut conn, project.id, &input)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.current_stage, ProjectStage::Design);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unchanged_project_update_keeps_row(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let same = ProjectRepo::update(&mut conn, project.id, &new_project("Lamp"))
        .await
        .unwrap();
    assert_eq!(same, Some(project));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_missing_project_returns_none(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let result = ProjectRepo::update(&mut conn, 999_999, &new_project("Ghost"))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_count_by_stage(pool: PgPool) {
    ProjectRepo::create(&pool, &new_project("A")).await.unwrap();
    ProjectRepo::create(&pool, &new_project("B")).await.unwrap();
    let mut launched = new_project("C");
    launched.current_stage = ProjectStage::Launched;
    ProjectRepo::create(&pool, &launched).await.unwrap();

    let counts = ProjectRepo::count_by_stage(&pool).await.unwrap();
    let concept = counts
        .iter()
        .find(|c| c.current_stage == ProjectStage::Concept)
        .unwrap();
    assert_eq!(concept.project_count, 2);
    let launched = counts
        .iter()
        .find(|c| c.current_stage == ProjectStage::Launched)
        .unwrap();
    assert_eq!(launched.project_count, 1);
    assert_eq!(counts.len(), 2);
}

// ---------------------------------------------------------------------------
// Stage upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upsert_creates_then_overwrites(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let created = StageRepo::upsert(
        &mut conn,
        StageKind::Design,
        project.id,
        &design_values(Some(100.0), Some("Rui")),
    )
    .await
    .unwrap();
    assert_eq!(created.project_id, project.id);
    assert_eq!(created.get("cost"), Some(&FieldValue::Float(Some(100.0))));

    // Overwrite, not merge: the artist goes back to NULL.
    let overwritten = StageRepo::upsert(
        &mut conn,
        StageKind::Design,
        project.id,
        &design_values(Some(250.0), None),
    )
    .await
    .unwrap();
    assert_eq!(overwritten.id, created.id);
    assert_eq!(overwritten.get("cost"), Some(&FieldValue::Float(Some(250.0))));
    assert_eq!(overwritten.get("artist"), Some(&FieldValue::Text(None)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upsert_same_values_is_idempotent(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let values = design_values(Some(80.5), Some("Rui"));

    let first = StageRepo::upsert(&mut conn, StageKind::Design, project.id, &values)
        .await
        .unwrap();
    let second = StageRepo::upsert(&mut conn, StageKind::Design, project.id, &values)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ensure_creates_blank_record_once(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let first = StageRepo::ensure(&mut conn, StageKind::Launch, project.id)
        .await
        .unwrap();
    assert!(first.is_blank());
    let second = StageRepo::ensure(&mut conn, StageKind::Launch, project.id)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_stage_row_violates_unique_constraint(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    sqlx::query("INSERT INTO design (project_id) VALUES ($1)")
        .bind(project.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = sqlx::query("INSERT INTO design (project_id) VALUES ($1)")
        .bind(project.id)
        .execute(&pool)
        .await
        .unwrap_err();
    assert_matches!(err, sqlx::Error::Database(ref db) if db.constraint() == Some("uq_design_project_id"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_every_stage_kind_round_trips_blank(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    for kind in StageKind::ALL {
        let record = StageRepo::ensure(&mut conn, kind, project.id).await.unwrap();
        assert_eq!(record.kind, kind);
        assert!(record.is_blank(), "{kind} should start blank");
        assert_eq!(record.fields.len(), kind.columns().len());
    }

    let listed = StageRepo::list_for_project(&mut conn, project.id).await.unwrap();
    let kinds: Vec<_> = listed.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, StageKind::ALL.to_vec());
}

// ---------------------------------------------------------------------------
// Attachments and cascade
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_attachment_links_to_stage(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let design = StageRepo::ensure(&mut conn, StageKind::Design, project.id)
        .await
        .unwrap();

    let attachment = AttachmentRepo::create(&pool, &new_attachment(project.id, design.id, "k/1"))
        .await
        .unwrap();
    assert_eq!(attachment.stage_kind, StageKind::Design);
    assert_eq!(attachment.stage_id, design.id);

    let by_stage = AttachmentRepo::list_by_stage(&pool, StageKind::Design, design.id)
        .await
        .unwrap();
    assert_eq!(by_stage, vec![attachment.clone()]);

    let removed = AttachmentRepo::delete(&pool, attachment.id).await.unwrap();
    assert_eq!(removed, Some(attachment));
    assert!(AttachmentRepo::list_by_project(&pool, project.id)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_delete_cascades_to_every_stage_and_attachment(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    for kind in StageKind::ALL {
        StageRepo::ensure(&mut conn, kind, project.id).await.unwrap();
    }
    let design = StageRepo::find_by_project(&pool, StageKind::Design, project.id)
        .await
        .unwrap()
        .unwrap();
    AttachmentRepo::create(&pool, &new_attachment(project.id, design.id, "k/1"))
        .await
        .unwrap();

    assert!(ProjectRepo::delete(&pool, project.id).await.unwrap());

    for kind in StageKind::ALL {
        let remaining = StageRepo::find_by_project(&pool, kind, project.id)
            .await
            .unwrap();
        assert!(remaining.is_none(), "{kind} row survived project delete");
    }
    assert!(AttachmentRepo::list_by_project(&pool, project.id)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_all_for_project_counts_rows(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Lamp")).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    StageRepo::ensure(&mut conn, StageKind::Design, project.id)
        .await
        .unwrap();
    StageRepo::ensure(&mut conn, StageKind::Modeling, project.id)
        .await
        .unwrap();

    let removed = StageRepo::delete_all_for_project(&mut conn, project.id)
        .await
        .unwrap();
    assert_eq!(removed, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_uncommitted_transaction_leaves_nothing(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let project = ProjectRepo::create(&mut *tx, &new_project("Lamp")).await.unwrap();
    StageRepo::ensure(&mut *tx, StageKind::Design, project.id)
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(ProjectRepo::find_by_id(&pool, project.id)
        .await
        .unwrap()
        .is_none());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM design")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_health_check(pool: PgPool) {
    stagetrack_db::health_check(&pool).await.unwrap();
}
