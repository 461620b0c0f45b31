//! Target table schemas and schema-bound records.
//!
//! A [`Record`] can only hold the columns of its [`TableSchema`], which keeps
//! source-only fields from ever reaching an INSERT statement.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::value::FieldValue;

/// Static description of a target table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name in the online database.
    pub table: &'static str,

    /// Auto-increment primary key (never part of an INSERT).
    pub key: &'static str,

    /// Insertable columns in statement order.
    pub columns: &'static [&'static str],
}

impl TableSchema {
    /// Check whether a column belongs to this table.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

/// Parent record ("Report").
pub static REPORT_SCHEMA: TableSchema = TableSchema {
    table: "tblReport",
    key: "reportID",
    columns: &[
        "userID",
        "reportType",
        "unit",
        "numberOfOfficers",
        "numberOfSNCO",
        "numberOfEnlistedOfficers",
        "numberOfFods",
        "startTime",
        "endTime",
    ],
};

/// Child record ("Fod"), one per detected object.
pub static FOD_SCHEMA: TableSchema = TableSchema {
    table: "tblFod",
    key: "fodID",
    columns: &[
        "reportID",
        "fodImageName",
        "fodImageUri",
        "locationLatitude",
        "locationLongitude",
        "Comment",
        "source",
        "finalSource",
        "color",
        "finalColor",
        "material",
        "finalMaterial",
        "size",
        "finalSize",
        "bbx",
        "bby",
        "bbw",
        "bbh",
        "fodModelClassificationID",
        "fodModelClassificationFinal",
        "fodModelClassificationInferenceTime",
        "fodModelDetectionInferenceTime",
        "numberOfRetries",
        "phoneToGroundDistInCm",
        "topPrediction1",
        "topPrediction2",
        "topPrediction3",
        "emptyAlbumId",
        "createdTime",
    ],
};

/// Coordinates present at both row and record granularity in the source.
/// They are accepted as mapping targets and dropped before insert.
pub const STRIPPED_FIELDS: &[&str] = &["latitude", "longitude"];

/// Column of [`FOD_SCHEMA`] that references the parent report.
pub const FOD_REPORT_COLUMN: &str = "reportID";

/// Column of [`REPORT_SCHEMA`] holding the owning user.
pub const REPORT_OWNER_COLUMN: &str = "userID";

/// A row shaped exactly like a target table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static TableSchema,
    values: Vec<FieldValue>,
}

impl Record {
    /// Template with every column initialized to empty text.
    pub fn empty(schema: &'static TableSchema) -> Self {
        Self {
            schema,
            values: vec![FieldValue::empty(); schema.columns.len()],
        }
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    /// Get a column value, `None` if the column is not in the schema.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.schema.position(column).map(|i| &self.values[i])
    }

    /// Set a column value. Returns false (and stores nothing) for columns
    /// outside the schema.
    pub fn set(&mut self, column: &str, value: impl Into<FieldValue>) -> bool {
        match self.schema.position(column) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// True if the column is in the schema and still holds nothing.
    pub fn is_unset(&self, column: &str) -> bool {
        self.get(column).map(FieldValue::is_absent).unwrap_or(false)
    }

    /// Values in column order.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.schema.columns.iter().copied().zip(self.values.iter())
    }

    /// Replace every empty text value with NULL.
    pub fn normalize_nulls(&mut self) {
        for value in &mut self.values {
            *value = std::mem::replace(value, FieldValue::Null).null_if_empty();
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Parent payload produced by the transformer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    /// Run identifier in the offline store.
    pub source_run_id: i64,
    pub record: Record,
}

/// Child payload produced by the transformer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FodPayload {
    /// Detection identifier in the offline store.
    pub source_id: i64,
    pub record: Record,
}

/// Output of the transformer for one run. `fods` keeps source row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformedRun {
    pub report: ReportPayload,
    pub fods: Vec<FodPayload>,
}

impl TransformedRun {
    /// Source detection identifiers in insertion order.
    pub fn source_fod_ids(&self) -> Vec<i64> {
        self.fods.iter().map(|f| f.source_id).collect()
    }
}
