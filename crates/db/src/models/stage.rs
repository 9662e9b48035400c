//! Stage sub-record model.
//!
//! The thirteen stage tables share one shape (`id`, `project_id`, typed
//! nullable columns, timestamps), so a single struct represents all of them
//! with the stage-specific columns held by name.

use std::collections::BTreeMap;

use serde::Serialize;
use stagetrack_core::fields::FieldValue;
use stagetrack_core::stage::StageKind;
use stagetrack_core::types::{DbId, Timestamp};

/// One row of a stage table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub id: DbId,
    pub project_id: DbId,
    pub kind: StageKind,
    pub fields: BTreeMap<&'static str, FieldValue>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StageRecord {
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    /// True when every stage-specific column is NULL.
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(FieldValue::is_null)
    }
}
