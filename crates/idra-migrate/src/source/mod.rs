//! Offline source data: run snapshots and exported image blobs.
//!
//! The pipeline reads a run through [`RunSource`]. [`FileRunSource`] serves the
//! files written by [`OfflineDb::export_run`]: one JSON snapshot per table and
//! one image directory per run.

mod sqlite;

pub use sqlite::{ExportSummary, OfflineDb};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::SourceRow;
use crate::error::{MigrateError, Result};

/// Run-level table in the offline store.
pub const RUNS_TABLE: &str = "runsIdra";

/// Detection table in the offline store.
pub const FODS_TABLE: &str = "fodDataIdra";

/// Snapshot file name of a table for one run.
pub fn snapshot_file_name(table: &str, run_id: i64) -> String {
    format!("{}_run_{}.json", table, run_id)
}

/// Directory holding the exported images of a run.
pub fn run_images_dir(images_dir: &Path, run_id: i64) -> PathBuf {
    images_dir.join(format!("run_{}", run_id))
}

/// Everything the transformer needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub run_id: i64,

    /// The run's row from [`RUNS_TABLE`].
    pub run: SourceRow,

    /// The run's detections from [`FODS_TABLE`], in export order.
    pub fods: Vec<SourceRow>,
}

impl RunSnapshot {
    /// Build a snapshot from unfiltered rows, keeping only rows of `run_id`.
    pub fn from_rows(run_id: i64, runs: Vec<SourceRow>, fods: Vec<SourceRow>) -> Result<Self> {
        let id = run_id.to_string();

        let run = runs
            .into_iter()
            .find(|row| row.get("ID").map(str::trim) == Some(id.as_str()))
            .ok_or(MigrateError::RunNotFound(run_id))?;

        let total = fods.len();
        let fods: Vec<SourceRow> = fods
            .into_iter()
            .filter(|row| match row.get("runID") {
                Some(r) => r.trim() == id,
                None => true,
            })
            .collect();

        if fods.len() != total {
            warn!(
                "Run {}: ignored {} detection rows belonging to other runs",
                run_id,
                total - fods.len()
            );
        }

        Ok(Self { run_id, run, fods })
    }
}

/// Read access to exported run data.
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Load the run row and its detection rows.
    async fn load_run(&self, run_id: i64) -> Result<RunSnapshot>;

    /// Local image files of a run, sorted by file name.
    async fn blob_paths(&self, run_id: i64) -> Result<Vec<PathBuf>>;
}

/// [`RunSource`] over exported snapshot files and image directories.
#[derive(Debug, Clone)]
pub struct FileRunSource {
    snapshot_dir: PathBuf,
    images_dir: PathBuf,
}

impl FileRunSource {
    pub fn new(snapshot_dir: impl Into<PathBuf>, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            images_dir: images_dir.into(),
        }
    }

    async fn read_rows(&self, table: &str, run_id: i64) -> Result<Vec<SourceRow>> {
        let path = self.snapshot_dir.join(snapshot_file_name(table, run_id));
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            MigrateError::Io(std::io::Error::new(
                e.kind(),
                format!("reading snapshot {}: {}", path.display(), e),
            ))
        })?;
        let rows: Vec<SourceRow> = serde_json::from_str(&content)?;
        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }
}

#[async_trait]
impl RunSource for FileRunSource {
    async fn load_run(&self, run_id: i64) -> Result<RunSnapshot> {
        let runs = self.read_rows(RUNS_TABLE, run_id).await?;
        let fods = self.read_rows(FODS_TABLE, run_id).await?;
        RunSnapshot::from_rows(run_id, runs, fods)
    }

    async fn blob_paths(&self, run_id: i64) -> Result<Vec<PathBuf>> {
        list_files(&run_images_dir(&self.images_dir, run_id)).await
    }
}

/// Regular files directly inside `dir`, sorted.
pub async fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        MigrateError::Io(std::io::Error::new(
            e.kind(),
            format!("listing {}: {}", dir.display(), e),
        ))
    })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}
