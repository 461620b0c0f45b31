//! Conversion of exported run rows into target-schema records.
//!
//! A run becomes one `tblReport` record plus one `tblFod` record per detection
//! row. Child fields are filled in this order, never overwriting a non-empty
//! value once set:
//!
//! 1. image name and URI,
//! 2. the field mapping, read from the detection row and then the run row,
//! 3. same-named passthrough columns (`topPrediction1..3`),
//! 4. default values, resolved through [`AliasResolver`],
//!
//! followed by the `finalSize`/`createdTime` coercions (read from the detection
//! row when nothing above set them) and null normalization.

mod alias;
mod normalize;

pub use alias::{AliasResolver, DefaultValues, FieldMapping, ResolvedField};
pub use normalize::{capitalize, parse_int, parse_measurement, parse_timestamp};

use tracing::{debug, info};

use crate::core::schema::{FOD_REPORT_COLUMN, REPORT_OWNER_COLUMN, STRIPPED_FIELDS};
use crate::core::{
    object_key, FieldValue, FodPayload, Record, ReportPayload, SourceRow, TransformedRun,
    FOD_SCHEMA, REPORT_SCHEMA,
};
use crate::error::{MigrateError, Result};
use crate::source::{RunSnapshot, FODS_TABLE, RUNS_TABLE};

/// Run row columns and the report columns they fill as integers.
const REPORT_COUNTS: &[(&str, &str)] = &[
    ("nbreOfOfficers", "numberOfOfficers"),
    ("snco", "numberOfSNCO"),
    ("enlisted", "numberOfEnlistedOfficers"),
    ("fodCount", "numberOfFods"),
];

/// Detection columns copied under the same name when nothing else filled them.
const PASSTHROUGH_FIELDS: &[&str] = &["topPrediction1", "topPrediction2", "topPrediction3"];

const CREATED_TIME: &str = "createdTime";
const FINAL_SIZE: &str = "finalSize";

/// Builds [`TransformedRun`]s from [`RunSnapshot`]s.
#[derive(Debug, Clone)]
pub struct Transformer {
    mapping: FieldMapping,
    defaults: DefaultValues,
    /// `"{bucket}/{image_prefix}"`, the base of every `fodImageUri`.
    image_base: String,
    user_id: i64,
}

impl Transformer {
    /// Create a transformer. Fails if the mapping targets unknown columns.
    pub fn new(
        mapping: FieldMapping,
        defaults: DefaultValues,
        bucket: &str,
        image_prefix: &str,
        user_id: i64,
    ) -> Result<Self> {
        mapping.validate(&FOD_SCHEMA)?;
        Ok(Self {
            mapping,
            defaults,
            image_base: object_key(bucket, image_prefix),
            user_id,
        })
    }

    /// Transform a whole run. Output detections keep snapshot row order.
    pub fn transform_run(&self, snapshot: &RunSnapshot) -> Result<TransformedRun> {
        let report = self.build_report(snapshot.run_id, &snapshot.run)?;

        let fods = snapshot
            .fods
            .iter()
            .map(|row| self.build_fod(snapshot.run_id, &snapshot.run, row))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Transformed run {} into 1 report and {} detections",
            snapshot.run_id,
            fods.len()
        );
        Ok(TransformedRun { report, fods })
    }

    /// Build the report record from the run row.
    pub fn build_report(&self, run_id: i64, run: &SourceRow) -> Result<ReportPayload> {
        let mut record = Record::empty(&REPORT_SCHEMA);
        record.set(REPORT_OWNER_COLUMN, self.user_id);

        let report_type = required(run_id, run, "reportType")?;
        record.set("reportType", capitalize(report_type));
        if let Some(unit) = run.get("unit") {
            record.set("unit", unit);
        }

        for (source, target) in REPORT_COUNTS {
            let value = required(run_id, run, source)?;
            record.set(target, parse_int(source, value)?);
        }

        for field in ["startTime", "endTime"] {
            let value = run.get(field).unwrap_or("");
            record.set(field, parse_timestamp(field, value)?);
        }

        record.normalize_nulls();
        Ok(ReportPayload {
            source_run_id: run_id,
            record,
        })
    }

    /// Build one detection record from its row and the run row.
    ///
    /// `reportID` is left null; the writer stamps it after the report insert.
    pub fn build_fod(&self, run_id: i64, run: &SourceRow, row: &SourceRow) -> Result<FodPayload> {
        let source_id = parse_int("ID", row.get("ID").unwrap_or(""))?;
        let image_name = row
            .get_non_empty("imageName")
            .ok_or_else(|| MigrateError::MissingMappedField {
                field: "imageName".to_string(),
                record: FODS_TABLE.to_string(),
                run_id,
            })?;

        let mut record = Record::empty(&FOD_SCHEMA);
        record.set("fodImageName", image_name);
        record.set("fodImageUri", object_key(&self.image_base, image_name));

        for (source, target) in self.mapping.iter() {
            let value = row
                .get(source)
                .or_else(|| run.get(source))
                .ok_or_else(|| MigrateError::MissingMappedField {
                    field: source.to_string(),
                    record: format!("{} or {}", FODS_TABLE, RUNS_TABLE),
                    run_id,
                })?;
            if STRIPPED_FIELDS.contains(&target) {
                continue;
            }
            record.set(target, value);
        }

        for field in PASSTHROUGH_FIELDS {
            if record.is_unset(field) {
                if let Some(value) = row.get(field) {
                    record.set(field, value);
                }
            }
        }

        self.apply_defaults(&mut record, row);

        let final_size = match record.get(FINAL_SIZE).and_then(FieldValue::as_text) {
            Some(text) if !text.trim().is_empty() => Some(parse_measurement(FINAL_SIZE, text)?),
            _ => match row.get_non_empty(FINAL_SIZE) {
                Some(text) => Some(parse_measurement(FINAL_SIZE, text)?),
                None => None,
            },
        };
        if let Some(size) = final_size {
            record.set(FINAL_SIZE, size);
        }

        let created = row
            .get(CREATED_TIME)
            .or_else(|| record.get(CREATED_TIME).and_then(FieldValue::as_text))
            .unwrap_or("");
        let created = parse_timestamp(CREATED_TIME, created)?;
        record.set(CREATED_TIME, created);

        record.normalize_nulls();
        Ok(FodPayload { source_id, record })
    }

    fn apply_defaults(&self, record: &mut Record, row: &SourceRow) {
        let resolver = AliasResolver::new(&self.mapping);

        for (key, default) in self.defaults.iter() {
            let field = resolver.resolve(key);
            if !FOD_SCHEMA.has_column(field.target) || field.target == FOD_REPORT_COLUMN {
                debug!("Default for {} has no detection column, skipping", key);
                continue;
            }
            if !record.is_unset(field.target) {
                continue;
            }
            let value = row.get_non_empty(field.source).unwrap_or(default);
            record.set(field.target, value);
        }
    }
}

/// A run row column that must be present, possibly empty.
fn required<'a>(run_id: i64, run: &'a SourceRow, field: &str) -> Result<&'a str> {
    run.get(field).ok_or_else(|| MigrateError::MissingMappedField {
        field: field.to_string(),
        record: RUNS_TABLE.to_string(),
        run_id,
    })
}
