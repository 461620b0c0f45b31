//! Export of one run from the offline SQLite store.
//!
//! Writes the run's image blobs to `{images_dir}/run_{id}/` and the non-BLOB
//! columns of its rows to text-typed JSON snapshots read by
//! [`FileRunSource`](super::FileRunSource).

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{run_images_dir, snapshot_file_name, FODS_TABLE, RUNS_TABLE};
use crate::core::SourceRow;
use crate::error::{MigrateError, Result};

/// Counts reported by [`OfflineDb::export_run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub run_id: i64,
    pub images_written: usize,
    pub images_skipped: usize,
    pub run_rows: usize,
    pub fod_rows: usize,
}

/// Read-only handle on the offline database.
pub struct OfflineDb {
    conn: Connection,
}

impl OfflineDb {
    /// Open an existing database read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        info!("Opened offline database {}", path.display());
        Ok(Self { conn })
    }

    /// Number of detections per run, largest first.
    pub fn run_image_counts(&self) -> Result<Vec<(i64, i64)>> {
        let sql = format!(
            "SELECT runID, COUNT(*) AS count FROM \"{}\" GROUP BY runID ORDER BY count DESC",
            FODS_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Export blobs and snapshots of one run.
    pub fn export_run(
        &self,
        run_id: i64,
        images_dir: &Path,
        snapshot_dir: &Path,
    ) -> Result<ExportSummary> {
        for (run, count) in self.run_image_counts()? {
            debug!("Run ID: {}, number of images: {}", run, count);
        }

        let mut summary = ExportSummary {
            run_id,
            ..Default::default()
        };

        let run_images = run_images_dir(images_dir, run_id);
        std::fs::create_dir_all(&run_images)?;
        self.export_blobs(run_id, &run_images, &mut summary)?;

        std::fs::create_dir_all(snapshot_dir)?;
        summary.run_rows = self.export_snapshot(RUNS_TABLE, "ID", run_id, snapshot_dir)?;
        summary.fod_rows = self.export_snapshot(FODS_TABLE, "runID", run_id, snapshot_dir)?;

        if summary.run_rows == 0 {
            return Err(MigrateError::RunNotFound(run_id));
        }

        info!(
            "Exported run {}: {} images written, {} already present, {} detections",
            run_id, summary.images_written, summary.images_skipped, summary.fod_rows
        );
        Ok(summary)
    }

    fn export_blobs(&self, run_id: i64, dir: &Path, summary: &mut ExportSummary) -> Result<()> {
        let sql = format!(
            "SELECT fodImage, imageName FROM \"{}\" WHERE runID = ?1",
            FODS_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![run_id])?;

        while let Some(row) = rows.next()? {
            let image_name: String = row.get(1)?;
            // Image names come from the device; never let them escape the run directory
            let Some(file_name) = Path::new(&image_name).file_name() else {
                warn!("Run {}: skipping image with unusable name '{}'", run_id, image_name);
                continue;
            };
            let path = dir.join(file_name);
            if path.is_file() {
                summary.images_skipped += 1;
                continue;
            }

            match row.get_ref(0)? {
                ValueRef::Blob(bytes) => {
                    std::fs::write(&path, bytes)?;
                    summary.images_written += 1;
                    debug!("Exported image: {}", image_name);
                }
                _ => warn!("Run {}: image {} has no blob data", run_id, image_name),
            }
        }
        Ok(())
    }

    /// Non-BLOB columns of a table, in declaration order.
    fn text_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
        let columns = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut names = Vec::new();
        for column in columns {
            let (name, decl_type) = column?;
            if !decl_type.eq_ignore_ascii_case("BLOB") {
                names.push(name);
            }
        }
        if names.is_empty() {
            return Err(MigrateError::Config(format!(
                "table {} is not available in the offline database",
                table
            )));
        }
        Ok(names)
    }

    fn export_snapshot(
        &self,
        table: &str,
        run_column: &str,
        run_id: i64,
        snapshot_dir: &Path,
    ) -> Result<usize> {
        let columns = self.text_columns(table)?;
        let column_list = columns
            .iter()
            .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1",
            column_list, table, run_column
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![run_id])?;
        let mut snapshot: Vec<SourceRow> = Vec::new();

        while let Some(row) = rows.next()? {
            let mut source_row = SourceRow::new();
            for (i, column) in columns.iter().enumerate() {
                source_row.insert(column.as_str(), value_to_text(row.get_ref(i)?));
            }
            snapshot.push(source_row);
        }

        let path = snapshot_dir.join(snapshot_file_name(table, run_id));
        let content = serde_json::to_string_pretty(&snapshot)?;

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &path)?;

        debug!("Wrote {} rows to {}", snapshot.len(), path.display());
        Ok(snapshot.len())
    }
}

/// Text form of a SQLite value as it appears in snapshots.
fn value_to_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(_) => String::new(),
    }
}
