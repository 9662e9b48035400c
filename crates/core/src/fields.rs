//! Submitted form fields and the tolerant converters applied to them.
//!
//! Conversion rules, shared by every numeric and date input:
//! - a missing key or a blank value becomes `None`,
//! - a non-empty value that does not parse is a [`CoreError::InvalidField`]
//!   naming the form key. Values are never coerced to a default.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::stage::{Column, ColumnType, StageKind};
use crate::types::Date;

/// Accepted date format for all date inputs.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Converters
// ---------------------------------------------------------------------------

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an optional 32-bit integer.
pub fn parse_optional_int(field: &str, raw: Option<&str>) -> Result<Option<i32>, CoreError> {
    non_blank(raw)
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| CoreError::invalid_field(field, format!("'{s}' is not a whole number")))
        })
        .transpose()
}

/// Parse an optional finite floating-point number.
pub fn parse_optional_float(field: &str, raw: Option<&str>) -> Result<Option<f64>, CoreError> {
    non_blank(raw)
        .map(|s| match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(CoreError::invalid_field(
                field,
                format!("'{s}' is not a number"),
            )),
        })
        .transpose()
}

/// Parse an optional `YYYY-MM-DD` date.
pub fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<Date>, CoreError> {
    non_blank(raw)
        .map(|s| {
            Date::parse_from_str(s, DATE_FORMAT).map_err(|_| {
                CoreError::invalid_field(field, format!("'{s}' is not a date (expected YYYY-MM-DD)"))
            })
        })
        .transpose()
}

/// Trim an optional free-text value and enforce its column width.
///
/// NUL characters are rejected; Postgres text columns cannot store them.
pub fn parse_optional_text(
    field: &str,
    raw: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, CoreError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(s) if s.contains('\0') => Err(CoreError::invalid_field(
            field,
            "must not contain NUL characters",
        )),
        Some(s) if s.chars().count() > max_len => Err(CoreError::invalid_field(
            field,
            format!("must be at most {max_len} characters"),
        )),
        Some(s) => Ok(Some(s.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Typed values
// ---------------------------------------------------------------------------

/// A converted, nullable stage column value.
///
/// Serializes as the bare value (`null` when absent).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(Option<i32>),
    Float(Option<f64>),
    Date(Option<Date>),
    Text(Option<String>),
}

impl FieldValue {
    /// The absent value for a column of type `ty`.
    pub fn null(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Int => FieldValue::Int(None),
            ColumnType::Float => FieldValue::Float(None),
            ColumnType::Date => FieldValue::Date(None),
            ColumnType::Text { .. } => FieldValue::Text(None),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            FieldValue::Int(v) => v.is_none(),
            FieldValue::Float(v) => v.is_none(),
            FieldValue::Date(v) => v.is_none(),
            FieldValue::Text(v) => v.is_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Form fields
// ---------------------------------------------------------------------------

/// Flat key/value text fields from one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    values: BTreeMap<String, String>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field. A repeated key keeps the last value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A required, non-blank text field.
    pub fn required_text(&self, key: &str, max_len: usize) -> Result<String, CoreError> {
        parse_optional_text(key, self.get(key), max_len)?
            .ok_or_else(|| CoreError::invalid_field(key, "is required"))
    }

    pub fn optional_text(&self, key: &str, max_len: usize) -> Result<Option<String>, CoreError> {
        parse_optional_text(key, self.get(key), max_len)
    }

    pub fn optional_date(&self, key: &str) -> Result<Option<Date>, CoreError> {
        parse_optional_date(key, self.get(key))
    }

    /// Whether the submission carries any key belonging to `kind`, blank or not.
    pub fn touches(&self, kind: StageKind) -> bool {
        kind.columns()
            .iter()
            .any(|column| self.contains(&kind.form_key(column)))
    }

    /// Convert the submitted value for one stage column.
    pub fn stage_value(&self, kind: StageKind, column: &Column) -> Result<FieldValue, CoreError> {
        let key = kind.form_key(column);
        let raw = self.get(&key);
        Ok(match column.ty {
            ColumnType::Int => FieldValue::Int(parse_optional_int(&key, raw)?),
            ColumnType::Float => FieldValue::Float(parse_optional_float(&key, raw)?),
            ColumnType::Date => FieldValue::Date(parse_optional_date(&key, raw)?),
            ColumnType::Text { max_len } => {
                FieldValue::Text(parse_optional_text(&key, raw, max_len)?)
            }
        })
    }

    /// Convert every column of `kind`, in column order.
    ///
    /// Missing keys become `None`; the first unparsable value aborts.
    pub fn stage_values(&self, kind: StageKind) -> Result<Vec<FieldValue>, CoreError> {
        kind.columns()
            .iter()
            .map(|column| self.stage_value(kind, column))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}
