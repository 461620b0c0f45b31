//! Per-run completion marker.
//!
//! Written as the last object of a migrated run, after every identity map has
//! been uploaded. A run whose mapping prefix holds objects but no marker was
//! interrupted between the database writes and the end of the artifact
//! uploads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::object_key;
use crate::error::Result;

/// File name of the marker under a run's mapping prefix.
pub const MARKER_FILE: &str = "_SUCCESS.json";

/// Key of the marker for a run's mapping prefix.
pub fn marker_key(run_prefix: &str) -> String {
    object_key(run_prefix, MARKER_FILE)
}

/// SHA-256 of an uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    pub key: String,
    pub sha256: String,
}

impl ArtifactDigest {
    pub fn of(key: impl Into<String>, content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self {
            key: key.into(),
            sha256: hex::encode(hasher.finalize()),
        }
    }
}

/// Contents of `_SUCCESS.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub run_id: i64,
    pub report_id: i64,
    pub fod_count: usize,
    pub artifacts: Vec<ArtifactDigest>,
    pub completed_at: DateTime<Utc>,
}

impl CompletionMarker {
    pub fn new(run_id: i64, report_id: i64, fod_count: usize, artifacts: Vec<ArtifactDigest>) -> Self {
        Self {
            run_id,
            report_id,
            fod_count,
            artifacts,
            completed_at: Utc::now(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_slice(content: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(content)?)
    }
}
