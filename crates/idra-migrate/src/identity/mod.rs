//! Offline-to-online identifier maps.
//!
//! Two maps per run: the run id to the generated report id, and each offline
//! detection id to its generated `fodID`. Both are written as JSON objects
//! (`{"101": 55, ...}`) whose entry order is insertion order.

use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::info;

use crate::error::{MigrateError, Result};

/// Ordered source id -> target id pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    pairs: Vec<(i64, i64)>,
}

impl IdentityMap {
    /// Map of a run to its report.
    pub fn single(source: i64, target: i64) -> Self {
        Self {
            pairs: vec![(source, target)],
        }
    }

    /// Zip source ids (insertion order) with generated ids (ascending).
    pub fn zip(run_id: i64, source_ids: &[i64], target_ids: &[i64]) -> Result<Self> {
        if source_ids.len() != target_ids.len() {
            return Err(MigrateError::IdentityMapLengthMismatch {
                run_id,
                source_count: source_ids.len(),
                target_count: target_ids.len(),
            });
        }
        Ok(Self {
            pairs: source_ids
                .iter()
                .copied()
                .zip(target_ids.iter().copied())
                .collect(),
        })
    }

    pub fn get(&self, source: i64) -> Option<i64> {
        self.pairs
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, t)| *t)
    }

    pub fn pairs(&self) -> &[(i64, i64)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Serialize for IdentityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (source, target) in &self.pairs {
            map.serialize_entry(&source.to_string(), target)?;
        }
        map.end()
    }
}

/// Both identity maps of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    pub run_id: i64,
    pub report_id: i64,
    pub report: IdentityMap,
    pub fods: IdentityMap,
}

impl RunIdentity {
    /// Build both maps from the transformer's source ids and the writer's
    /// generated ids.
    pub fn build(
        run_id: i64,
        report_id: i64,
        source_fod_ids: &[i64],
        fod_ids: &[i64],
    ) -> Result<Self> {
        Ok(Self {
            run_id,
            report_id,
            report: IdentityMap::single(run_id, report_id),
            fods: IdentityMap::zip(run_id, source_fod_ids, fod_ids)?,
        })
    }

    pub fn report_file_name(&self) -> String {
        format!("report-offline-{}-online-{}.json", self.run_id, self.report_id)
    }

    pub fn fods_file_name(&self) -> String {
        format!("fods-offline-{}-online-{}.json", self.run_id, self.report_id)
    }

    /// Write both maps into `dir`, creating it if needed. Returns the report
    /// map path, then the detection map path.
    pub fn persist(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let report_path = dir.join(self.report_file_name());
        write_json(&report_path, &self.report)?;

        let fods_path = dir.join(self.fods_file_name());
        write_json(&fods_path, &self.fods)?;

        info!(
            "Saved identity maps for run {} (report {}, {} detections) to {}",
            self.run_id,
            self.report_id,
            self.fods.len(),
            dir.display()
        );
        Ok(vec![report_path, fods_path])
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;

    // Atomic write: write to temp file, then rename
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, &content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
