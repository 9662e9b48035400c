//! Stage catalogue: the project lifecycle labels and the per-stage record
//! layouts.
//!
//! Every stage kind owns one table with a fixed set of nullable columns.
//! The column tables below are the single source of truth for the SQL the
//! repository layer builds and for the form keys the synchronizer reads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Project lifecycle
// ---------------------------------------------------------------------------

/// The pipeline position recorded on a project.
///
/// Stored as an opaque label. Any value may be assigned from any other;
/// `Cancelled` is reachable from everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStage {
    Concept,
    Design,
    Modeling,
    Prototype,
    Contract,
    Production,
    Launched,
    Completed,
    Cancelled,
}

impl ProjectStage {
    /// Every lifecycle label in pipeline order, `Cancelled` last.
    pub const ALL: [ProjectStage; 9] = [
        ProjectStage::Concept,
        ProjectStage::Design,
        ProjectStage::Modeling,
        ProjectStage::Prototype,
        ProjectStage::Contract,
        ProjectStage::Production,
        ProjectStage::Launched,
        ProjectStage::Completed,
        ProjectStage::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStage::Concept => "CONCEPT",
            ProjectStage::Design => "DESIGN",
            ProjectStage::Modeling => "MODELING",
            ProjectStage::Prototype => "PROTOTYPE",
            ProjectStage::Contract => "CONTRACT",
            ProjectStage::Production => "PRODUCTION",
            ProjectStage::Launched => "LAUNCHED",
            ProjectStage::Completed => "COMPLETED",
            ProjectStage::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ProjectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStage {
    type Err = CoreError;

    /// Labels are matched case-insensitively after trimming.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProjectStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                CoreError::invalid_field(
                    "current_stage",
                    format!("unknown stage '{wanted}'"),
                )
            })
    }
}

impl TryFrom<String> for ProjectStage {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Stage record layouts
// ---------------------------------------------------------------------------

/// Storage type of a single stage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// PostgreSQL `INTEGER`.
    Int,
    /// PostgreSQL `DOUBLE PRECISION`.
    Float,
    /// PostgreSQL `DATE`, submitted as `YYYY-MM-DD`.
    Date,
    /// PostgreSQL `VARCHAR(max_len)`.
    Text { max_len: usize },
}

/// One nullable measurable column of a stage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn int(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Int }
}

const fn float(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Float }
}

const fn date(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Date }
}

const fn text(name: &'static str, max_len: usize) -> Column {
    Column { name, ty: ColumnType::Text { max_len } }
}

const COMMUNICATION: &[Column] = &[
    int("num_phone_calls"),
    int("num_messages_client"),
    int("num_messages_us"),
    int("response_time_max_client"),
    int("response_time_avg_client"),
    int("response_time_min_client"),
    int("response_time_max_us"),
    int("response_time_avg_us"),
    int("response_time_min_us"),
];

const DESIGN: &[Column] = &[
    date("start_date"),
    date("end_date"),
    float("cost"),
    text("artist", 255),
];

const MODELING: &[Column] = &[
    date("start_date"),
    date("end_date"),
    float("cost"),
    text("artist", 255),
    int("num_exploded_pieces"),
];

const PROTOTYPE: &[Column] = &[
    date("start_date"),
    date("end_date"),
    float("cost"),
    int("num_exploded_pieces"),
    date("shipped_date"),
    float("dimensions_height"),
    float("dimensions_length"),
    float("dimensions_depth"),
    float("weight"),
];

const PRODUCT_PICTURES: &[Column] = &[date("start_date"), date("end_date"), float("cost")];

const CONTRACT: &[Column] = &[date("sent_date"), date("signed_date")];

const TOOLING: &[Column] = &[
    int("num_tools"),
    float("cost"),
    date("start_date"),
    date("end_date"),
];

const PRODUCTION: &[Column] = &[date("start_date"), date("end_date"), float("cost")];

const PACKAGING: &[Column] = &[
    date("start_date"),
    date("end_date"),
    float("cost"),
    text("artist", 255),
];

const FREIGHT: &[Column] = &[
    text("freight_type", 50),
    float("cost"),
    text("size", 50),
    float("weight"),
    date("start_date"),
    date("end_date"),
];

const SHIPPING: &[Column] = &[
    date("start_date"),
    date("end_date"),
    float("avg_price"),
    float("avg_cost"),
    float("domestic_price"),
    float("avg_international_price"),
    float("avg_international_cost"),
];

const LAUNCH: &[Column] = &[
    date("start_date"),
    date("end_date"),
    int("units_sold"),
    float("retail_price"),
    float("cash_collected"),
    float("commission_paid"),
];

const CUSTOMER_SERVICE: &[Column] = &[
    int("num_breakages"),
    int("num_refunds"),
    int("num_customer_service_messages"),
];

/// Which stage table a sub-record or attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Communication,
    Design,
    Modeling,
    Prototype,
    ProductPictures,
    Contract,
    Tooling,
    Production,
    Packaging,
    Freight,
    Shipping,
    Launch,
    CustomerService,
}

impl StageKind {
    /// Every stage kind, in the order the detail view presents them.
    pub const ALL: [StageKind; 13] = [
        StageKind::Communication,
        StageKind::Design,
        StageKind::Modeling,
        StageKind::Prototype,
        StageKind::ProductPictures,
        StageKind::Contract,
        StageKind::Tooling,
        StageKind::Production,
        StageKind::Packaging,
        StageKind::Freight,
        StageKind::Shipping,
        StageKind::Launch,
        StageKind::CustomerService,
    ];

    /// Stable identifier used for form-key prefixes, blob paths and the
    /// `attachments.stage_kind` column.
    pub fn slug(self) -> &'static str {
        match self {
            StageKind::Communication => "communication",
            StageKind::Design => "design",
            StageKind::Modeling => "modeling",
            StageKind::Prototype => "prototype",
            StageKind::ProductPictures => "product_pictures",
            StageKind::Contract => "contract",
            StageKind::Tooling => "tooling",
            StageKind::Production => "production",
            StageKind::Packaging => "packaging",
            StageKind::Freight => "freight",
            StageKind::Shipping => "shipping",
            StageKind::Launch => "launch",
            StageKind::CustomerService => "customer_service",
        }
    }

    /// Table holding this stage's records. Matches the slug.
    pub fn table(self) -> &'static str {
        self.slug()
    }

    /// The stage-specific columns, excluding `id`, `project_id` and
    /// timestamps.
    pub fn columns(self) -> &'static [Column] {
        match self {
            StageKind::Communication => COMMUNICATION,
            StageKind::Design => DESIGN,
            StageKind::Modeling => MODELING,
            StageKind::Prototype => PROTOTYPE,
            StageKind::ProductPictures => PRODUCT_PICTURES,
            StageKind::Contract => CONTRACT,
            StageKind::Tooling => TOOLING,
            StageKind::Production => PRODUCTION,
            StageKind::Packaging => PACKAGING,
            StageKind::Freight => FREIGHT,
            StageKind::Shipping => SHIPPING,
            StageKind::Launch => LAUNCH,
            StageKind::CustomerService => CUSTOMER_SERVICE,
        }
    }

    /// Form key under which `column` of this stage is submitted.
    pub fn form_key(self, column: &Column) -> String {
        format!("{}_{}", self.slug(), column.name)
    }

    /// Multipart part name carrying uploads for this stage.
    pub fn upload_field(self) -> String {
        format!("{}_files", self.slug())
    }

    pub fn from_slug(slug: &str) -> Option<StageKind> {
        StageKind::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Resolve a multipart part name such as `design_files`.
    pub fn from_upload_field(name: &str) -> Option<StageKind> {
        name.strip_suffix("_files").and_then(StageKind::from_slug)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl TryFrom<String> for StageKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StageKind::from_slug(&value)
            .ok_or_else(|| CoreError::Internal(format!("unknown stage kind '{value}'")))
    }
}
