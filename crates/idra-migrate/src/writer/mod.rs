//! Dependent writes of one run: the report first, then its detections.

use tracing::{debug, info};

use crate::core::schema::{FOD_REPORT_COLUMN, REPORT_OWNER_COLUMN};
use crate::core::{FieldValue, Record, TargetStore, TransformedRun};
use crate::error::{MigrateError, Result};

/// Generated identifiers of a written run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub report_id: i64,
    /// Detection ids in ascending order, matching insertion order.
    pub fod_ids: Vec<i64>,
}

/// Writes a [`TransformedRun`] through a [`TargetStore`].
pub struct RelationalWriter<'a> {
    store: &'a mut dyn TargetStore,
}

impl<'a> RelationalWriter<'a> {
    pub fn new(store: &'a mut dyn TargetStore) -> Self {
        Self { store }
    }

    /// Insert the report, read back its id, then insert every detection in one
    /// atomic batch stamped with that id.
    ///
    /// A failed report insert leaves nothing written. A failed batch leaves the
    /// report row in place and no detections.
    pub async fn write_run(&mut self, run: &TransformedRun) -> Result<WriteOutcome> {
        let report = &run.report.record;
        let user_id = match report.get(REPORT_OWNER_COLUMN) {
            Some(FieldValue::Int(id)) => *id,
            _ => {
                return Err(MigrateError::Config(format!(
                    "report for run {} has no {}",
                    run.report.source_run_id, REPORT_OWNER_COLUMN
                )))
            }
        };

        self.store.insert(report).await?;
        let report_id = self
            .store
            .latest_report_id(user_id)
            .await?
            .ok_or(MigrateError::MissingGeneratedId(user_id))?;
        info!(
            "Inserted report {} for run {}",
            report_id, run.report.source_run_id
        );

        if run.fods.is_empty() {
            info!("Run {} has no detections", run.report.source_run_id);
            return Ok(WriteOutcome {
                report_id,
                fod_ids: Vec::new(),
            });
        }

        let fods: Vec<Record> = run
            .fods
            .iter()
            .map(|fod| {
                let mut record = fod.record.clone();
                record.set(FOD_REPORT_COLUMN, report_id);
                record
            })
            .collect();

        self.store.insert_many(&fods).await?;
        debug!("Inserted {} detections for report {}", fods.len(), report_id);

        let fod_ids = self.store.fod_ids(report_id).await?;
        info!(
            "Report {} now has {} detections",
            report_id,
            fod_ids.len()
        );

        Ok(WriteOutcome { report_id, fod_ids })
    }
}
