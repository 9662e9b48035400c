//! Repository for the thirteen stage tables.
//!
//! Statements are assembled from the column tables in
//! [`stagetrack_core::stage`], so every stage kind goes through the same
//! code path. Table and column names come only from those static tables,
//! never from user input.

use std::collections::BTreeMap;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, PgExecutor, Postgres, Row};
use stagetrack_core::fields::FieldValue;
use stagetrack_core::stage::{ColumnType, StageKind};
use stagetrack_core::types::DbId;

use crate::models::stage::StageRecord;

/// Provides find, upsert and delete operations for stage records.
pub struct StageRepo;

impl StageRepo {
    /// Find the record of `kind` owned by `project_id`.
    pub async fn find_by_project<'e>(
        executor: impl PgExecutor<'e>,
        kind: StageKind,
        project_id: DbId,
    ) -> Result<Option<StageRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE project_id = $1",
            select_list(kind),
            kind.table()
        );
        let row = sqlx::query(&query)
            .bind(project_id)
            .fetch_optional(executor)
            .await?;
        row.map(|row| decode_record(kind, &row)).transpose()
    }

    /// Every existing stage record of a project, in [`StageKind::ALL`] order.
    pub async fn list_for_project(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Vec<StageRecord>, sqlx::Error> {
        let mut records = Vec::new();
        for kind in StageKind::ALL {
            if let Some(record) = Self::find_by_project(&mut *conn, kind, project_id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Create the record of `kind` for a project, or overwrite every column
    /// of the existing one with `values`.
    ///
    /// `values` must follow [`StageKind::columns`] order. An overwrite that
    /// changes nothing leaves the row (including `updated_at`) as it was.
    pub async fn upsert(
        conn: &mut PgConnection,
        kind: StageKind,
        project_id: DbId,
        values: &[FieldValue],
    ) -> Result<StageRecord, sqlx::Error> {
        debug_assert_eq!(values.len(), kind.columns().len());

        if Self::find_by_project(&mut *conn, kind, project_id)
            .await?
            .is_none()
        {
            tracing::debug!(stage = %kind, project_id, "Creating stage record");
            return Self::insert(&mut *conn, kind, project_id, values).await;
        }

        let columns = kind.columns();
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", c.name, i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let names = column_names(kind);
        let params = placeholders(2, columns.len());
        let query = format!(
            "UPDATE {table} SET {assignments}, updated_at = NOW()
             WHERE project_id = $1 AND ({names}) IS DISTINCT FROM ({params})
             RETURNING {select}",
            table = kind.table(),
            select = select_list(kind),
        );

        let mut q = sqlx::query(&query).bind(project_id);
        for value in values {
            q = bind_value(q, value);
        }
        match q.fetch_optional(&mut *conn).await? {
            Some(row) => {
                tracing::debug!(stage = %kind, project_id, "Overwrote stage record");
                decode_record(kind, &row)
            }
            None => Self::find_by_project(&mut *conn, kind, project_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Return the existing record of `kind`, creating a blank one if absent.
    pub async fn ensure(
        conn: &mut PgConnection,
        kind: StageKind,
        project_id: DbId,
    ) -> Result<StageRecord, sqlx::Error> {
        match Self::find_by_project(&mut *conn, kind, project_id).await? {
            Some(record) => Ok(record),
            None => {
                let blank: Vec<FieldValue> =
                    kind.columns().iter().map(|c| FieldValue::null(c.ty)).collect();
                Self::insert(conn, kind, project_id, &blank).await
            }
        }
    }

    /// Delete every stage record of a project. Returns the number removed.
    pub async fn delete_all_for_project(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let mut removed = 0;
        for kind in StageKind::ALL {
            let query = format!("DELETE FROM {} WHERE project_id = $1", kind.table());
            removed += sqlx::query(&query)
                .bind(project_id)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        }
        Ok(removed)
    }

    async fn insert(
        conn: &mut PgConnection,
        kind: StageKind,
        project_id: DbId,
        values: &[FieldValue],
    ) -> Result<StageRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO {table} (project_id, {names}) VALUES ($1, {params}) RETURNING {select}",
            table = kind.table(),
            names = column_names(kind),
            params = placeholders(2, kind.columns().len()),
            select = select_list(kind),
        );
        let mut q = sqlx::query(&query).bind(project_id);
        for value in values {
            q = bind_value(q, value);
        }
        let row = q.fetch_one(&mut *conn).await?;
        decode_record(kind, &row)
    }
}

// ---------------------------------------------------------------------------
// SQL helpers
// ---------------------------------------------------------------------------

fn column_names(kind: StageKind) -> String {
    kind.columns()
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_list(kind: StageKind) -> String {
    format!("id, project_id, {}, created_at, updated_at", column_names(kind))
}

/// `$first, $first+1, ...` for `count` parameters.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &FieldValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        FieldValue::Int(v) => query.bind(*v),
        FieldValue::Float(v) => query.bind(*v),
        FieldValue::Date(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
    }
}

fn decode_record(kind: StageKind, row: &PgRow) -> Result<StageRecord, sqlx::Error> {
    let mut fields = BTreeMap::new();
    for column in kind.columns() {
        let value = match column.ty {
            ColumnType::Int => FieldValue::Int(row.try_get(column.name)?),
            ColumnType::Float => FieldValue::Float(row.try_get(column.name)?),
            ColumnType::Date => FieldValue::Date(row.try_get(column.name)?),
            ColumnType::Text { .. } => FieldValue::Text(row.try_get(column.name)?),
        };
        fields.insert(column.name, value);
    }

    Ok(StageRecord {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        kind,
        fields,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
