//! Migration orchestrator - per-run workflow coordinator.
//!
//! A run moves through the [`RunPhase`]s in declaration order. The two probe
//! phases may end it early: images already in the bucket skip the blob upload,
//! and objects under the run's mapping prefix skip the whole run. Any failure
//! ends the run with the failing phase attached to the error; database writes
//! made before the failure are not rolled back.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::{object_key, ObjectStore, TargetConnector, TransformedRun};
use crate::drivers::{build_object_store, MysqlConnector};
use crate::error::{MigrateError, Result};
use crate::identity::RunIdentity;
use crate::source::{FileRunSource, RunSource};
use crate::state::{marker_key, ArtifactDigest, CompletionMarker};
use crate::transform::{DefaultValues, FieldMapping, Transformer};
use crate::upload::ObjectUploader;
use crate::writer::{RelationalWriter, WriteOutcome};

/// Phases of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    CheckBlobsExist,
    UploadBlobs,
    CheckRecordsExist,
    Transform,
    Write,
    MapIdentities,
    UploadMappingArtifacts,
    MarkComplete,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::CheckBlobsExist => "check_blobs_exist",
            RunPhase::UploadBlobs => "upload_blobs",
            RunPhase::CheckRecordsExist => "check_records_exist",
            RunPhase::Transform => "transform",
            RunPhase::Write => "write",
            RunPhase::MapIdentities => "map_identities",
            RunPhase::UploadMappingArtifacts => "upload_mapping_artifacts",
            RunPhase::MarkComplete => "mark_complete",
        };
        f.write_str(name)
    }
}

/// Terminal state of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Skipped,
}

/// Why a run was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Mapping artifacts and the completion marker exist.
    AlreadyMigrated,
    /// Mapping artifacts exist but the completion marker does not.
    IncompleteMigration,
}

/// Outcome of the blob phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BlobPhase {
    AlreadyPresent,
    Uploaded { count: usize },
    NoBlobs,
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: i64,
    pub bucket: String,
    pub user_id: i64,
}

impl RunRequest {
    /// Fill the bucket and owner from the configuration when not given.
    pub fn resolve(
        run_id: i64,
        bucket: Option<String>,
        user_id: Option<i64>,
        config: &Config,
    ) -> Result<Self> {
        let user_id = user_id.or(config.migration.user_id).ok_or_else(|| {
            MigrateError::Config("no user id given and migration.user_id is not set".into())
        })?;
        Ok(Self {
            run_id,
            bucket: bucket.unwrap_or_else(|| config.object_store.bucket.clone()),
            user_id,
        })
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// Offline run identifier.
    pub run_id: i64,

    /// Final status.
    pub status: RunStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,

    pub blobs: BlobPhase,

    /// Generated report id (completed runs only).
    pub report_id: Option<i64>,

    /// Detections written.
    pub fod_count: usize,

    /// Mapping artifacts and marker uploaded by this run.
    pub artifact_keys: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of [`Orchestrator::health_check`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub target_type: String,
    pub target_ok: bool,
    pub store_type: String,
    pub bucket: String,
    pub store_ok: bool,
}

impl HealthReport {
    pub fn healthy(&self) -> bool {
        self.target_ok && self.store_ok
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    store: Arc<dyn ObjectStore>,
    connector: Arc<dyn TargetConnector>,
    source: Arc<dyn RunSource>,
}

impl Orchestrator {
    /// Create an orchestrator over explicit stores.
    pub fn new(
        config: Config,
        store: Arc<dyn ObjectStore>,
        connector: Arc<dyn TargetConnector>,
        source: Arc<dyn RunSource>,
    ) -> Self {
        Self {
            config,
            store,
            connector,
            source,
        }
    }

    /// Create an orchestrator over the stores named in the configuration.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = build_object_store(&config.object_store).await?;
        let connector = Arc::new(MysqlConnector::new(config.target.clone()));
        let source = Arc::new(FileRunSource::new(
            config.paths.snapshot_dir.clone(),
            config.paths.images_dir.clone(),
        ));
        Ok(Self::new(config, store, connector, source))
    }

    /// Migrate one run.
    pub async fn migrate(&self, request: &RunRequest) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = request.run_id;
        info!(
            "Starting migration of run {} into bucket {} for user {}",
            run_id, request.bucket, request.user_id
        );

        let uploader = ObjectUploader::new(
            self.store.clone(),
            request.bucket.clone(),
            self.config.migration.get_upload_workers(),
        );

        // Phase 1-2: image blobs
        let blobs = self.sync_blobs(request, &uploader).await?;

        // Phase 3: duplicate detection
        let run_prefix = self.config.migration.run_mapping_prefix(run_id);
        if let Some(reason) = self
            .check_records_exist(request, &run_prefix)
            .await
            .map_err(|e| fail(run_id, RunPhase::CheckRecordsExist, e))?
        {
            return Ok(finish(run_id, started_at, RunStatus::Skipped, Some(reason), blobs));
        }

        // Phase 4: transform
        let transformed = self
            .transform(request)
            .await
            .map_err(|e| fail(run_id, RunPhase::Transform, e))?;

        // Phase 5: relational writes
        let written = self
            .write(&transformed)
            .await
            .map_err(|e| fail(run_id, RunPhase::Write, e))?;

        // Phase 6: identity maps
        let identity = RunIdentity::build(
            run_id,
            written.report_id,
            &transformed.source_fod_ids(),
            &written.fod_ids,
        )
        .map_err(|e| fail(run_id, RunPhase::MapIdentities, e))?;
        let artifact_paths = identity
            .persist(&self.config.paths.run_mappings_dir(run_id))
            .map_err(|e| fail(run_id, RunPhase::MapIdentities, e))?;

        // Phase 7: mapping artifacts
        let mut artifact_keys = uploader
            .upload_all(&run_prefix, &artifact_paths)
            .await
            .into_result()
            .map_err(|e| fail(run_id, RunPhase::UploadMappingArtifacts, e))?;

        // Phase 8: completion marker
        let marker = self
            .mark_complete(&uploader, &run_prefix, &identity, &artifact_paths)
            .await
            .map_err(|e| fail(run_id, RunPhase::MarkComplete, e))?;
        artifact_keys.push(marker);

        let mut result = finish(run_id, started_at, RunStatus::Completed, None, blobs);
        result.report_id = Some(written.report_id);
        result.fod_count = written.fod_ids.len();
        result.artifact_keys = artifact_keys;

        info!(
            "Run {} migrated as report {} with {} detections in {:.1}s",
            run_id, written.report_id, result.fod_count, result.duration_seconds
        );
        Ok(result)
    }

    /// Check connectivity to the online database and the bucket.
    pub async fn health_check(&self) -> Result<HealthReport> {
        let target_ok = match self.connector.connect().await {
            Ok(mut conn) => {
                let pinged = conn.ping().await;
                if let Err(e) = conn.close().await {
                    warn!("Failed to close target connection: {}", e);
                }
                match pinged {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Target database ping failed: {}", e);
                        false
                    }
                }
            }
            Err(e) => {
                error!("Target database unreachable: {}", e);
                false
            }
        };

        let bucket = self.config.object_store.bucket.clone();
        let store_ok = match self.store.list(&bucket, "", 1).await {
            Ok(_) => true,
            Err(e) => {
                error!("Object store unreachable: {}", e);
                false
            }
        };

        Ok(HealthReport {
            target_type: self.connector.db_type().to_string(),
            target_ok,
            store_type: self.store.store_type().to_string(),
            bucket,
            store_ok,
        })
    }

    async fn sync_blobs(&self, request: &RunRequest, uploader: &ObjectUploader) -> Result<BlobPhase> {
        let run_id = request.run_id;
        let image_prefix = &self.config.migration.image_prefix;

        let paths = self
            .source
            .blob_paths(run_id)
            .await
            .map_err(|e| fail(run_id, RunPhase::CheckBlobsExist, e))?;
        let Some(first) = paths.first() else {
            warn!("Run {} has no exported images", run_id);
            return Ok(BlobPhase::NoBlobs);
        };

        let probe = object_key(image_prefix, &file_name(first));
        let present = self
            .store
            .head(&request.bucket, &probe)
            .await
            .map_err(|e| fail(run_id, RunPhase::CheckBlobsExist, e))?;
        if present {
            info!(
                "Images of run {} already in {} ({} exists), skipping upload",
                run_id, request.bucket, probe
            );
            return Ok(BlobPhase::AlreadyPresent);
        }

        let keys = uploader
            .upload_all(image_prefix, &paths)
            .await
            .into_result()
            .map_err(|e| fail(run_id, RunPhase::UploadBlobs, e))?;
        Ok(BlobPhase::Uploaded { count: keys.len() })
    }

    async fn check_records_exist(
        &self,
        request: &RunRequest,
        run_prefix: &str,
    ) -> Result<Option<SkipReason>> {
        // Trailing slash keeps run_1 from matching run_10
        let listed = self
            .store
            .list(&request.bucket, &format!("{}/", run_prefix), 1)
            .await?;
        if listed == 0 {
            return Ok(None);
        }

        let marker = marker_key(run_prefix);
        if self.store.head(&request.bucket, &marker).await? {
            info!(
                "Run {} already migrated ({} exists), skipping",
                request.run_id, marker
            );
            Ok(Some(SkipReason::AlreadyMigrated))
        } else {
            warn!(
                "Run {} has mapping artifacts under {} but no {}; a previous migration may \
                 have stopped part way. Skipping; verify the online records manually.",
                request.run_id, run_prefix, marker
            );
            Ok(Some(SkipReason::IncompleteMigration))
        }
    }

    async fn transform(&self, request: &RunRequest) -> Result<TransformedRun> {
        load_and_transform(&self.config, self.source.as_ref(), request).await
    }

    async fn write(&self, transformed: &TransformedRun) -> Result<WriteOutcome> {
        let mut conn = self.connector.connect().await?;
        let written = RelationalWriter::new(conn.as_mut())
            .write_run(transformed)
            .await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close target connection: {}", e);
        }
        written
    }

    async fn mark_complete(
        &self,
        uploader: &ObjectUploader,
        run_prefix: &str,
        identity: &RunIdentity,
        artifact_paths: &[PathBuf],
    ) -> Result<String> {
        let mut digests = Vec::with_capacity(artifact_paths.len());
        for path in artifact_paths {
            let key = object_key(run_prefix, &file_name(path));
            let content = tokio::fs::read(path).await?;
            digests.push(ArtifactDigest::of(key, &content));
        }

        let marker = CompletionMarker::new(
            identity.run_id,
            identity.report_id,
            identity.fods.len(),
            digests,
        );
        let key = marker_key(run_prefix);
        uploader.put(&key, marker.to_bytes()?).await?;
        info!("Marked run {} complete at {}", identity.run_id, key);
        Ok(key)
    }
}

/// Transform a run from its exported files without building any store client.
pub async fn preview(config: &Config, request: &RunRequest) -> Result<TransformedRun> {
    let source = FileRunSource::new(
        config.paths.snapshot_dir.clone(),
        config.paths.images_dir.clone(),
    );
    load_and_transform(config, &source, request)
        .await
        .map_err(|e| fail(request.run_id, RunPhase::Transform, e))
}

async fn load_and_transform(
    config: &Config,
    source: &dyn RunSource,
    request: &RunRequest,
) -> Result<TransformedRun> {
    let paths = &config.paths;
    let mapping = FieldMapping::load(&paths.field_map)?;
    let defaults = DefaultValues::load(&paths.default_values)?;
    let transformer = Transformer::new(
        mapping,
        defaults,
        &request.bucket,
        &config.migration.image_prefix,
        request.user_id,
    )?;

    let snapshot = source.load_run(request.run_id).await?;
    transformer.transform_run(&snapshot)
}

fn fail(run_id: i64, phase: RunPhase, e: MigrateError) -> MigrateError {
    let e = e.in_stage(phase);
    error!("Run {} failed: {}", run_id, e);
    e
}

fn finish(
    run_id: i64,
    started_at: DateTime<Utc>,
    status: RunStatus,
    skip_reason: Option<SkipReason>,
    blobs: BlobPhase,
) -> MigrationResult {
    let completed_at = Utc::now();
    MigrationResult {
        run_id,
        status,
        skip_reason,
        blobs,
        report_id: None,
        fod_count: 0,
        artifact_keys: Vec::new(),
        started_at,
        completed_at,
        duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_INTEGRITY_ERROR;
    use crate::testing::{MemoryStore, MemoryTarget};
    use tempfile::TempDir;

    const BUCKET: &str = "idra-commercial";

    struct Fixture {
        _dir: TempDir,
        config: Config,
        store: MemoryStore,
        target: MemoryTarget,
    }

    impl Fixture {
        fn new(fods: &str, images: &[&str]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            let snapshots = root.join("snapshots");
            let run_images = root.join("images").join("run_7");
            std::fs::create_dir_all(&snapshots).unwrap();
            std::fs::create_dir_all(&run_images).unwrap();

            std::fs::write(
                snapshots.join("runsIdra_run_7.json"),
                r#"[{"ID": "7", "startTime": "2024-03-05 08:00:00", "endTime": "2024-03-05 09:00:00",
                     "unit": "alpha", "reportType": "daily", "nbreOfOfficers": "2", "snco": "1",
                     "enlisted": "3", "fodCount": "2", "lat": "36.5"}]"#,
            )
            .unwrap();
            std::fs::write(snapshots.join("fodDataIdra_run_7.json"), fods).unwrap();
            for image in images {
                std::fs::write(run_images.join(image), image.as_bytes()).unwrap();
            }
            std::fs::write(
                root.join("field-map.json"),
                r#"{"clr": "color", "lat": "locationLatitude"}"#,
            )
            .unwrap();
            std::fs::write(root.join("default-values.json"), r#"{"material": "unknown"}"#)
                .unwrap();

            let yaml = format!(
                r#"
target:
  host: localhost
  database: idra
  user: migrator
object_store:
  backend: local
  bucket: {bucket}
  root: '{root}/store'
paths:
  images_dir: '{root}/images'
  snapshot_dir: '{root}/snapshots'
  mappings_dir: '{root}/mappings'
  field_map: '{root}/field-map.json'
  default_values: '{root}/default-values.json'
migration:
  user_id: 333
  upload_workers: 2
"#,
                bucket = BUCKET,
                root = root.display()
            );
            let config = Config::from_yaml(&yaml).unwrap();

            Self {
                _dir: dir,
                config,
                store: MemoryStore::default(),
                target: MemoryTarget::default(),
            }
        }

        fn standard() -> Self {
            Self::new(
                r#"[{"ID": "101", "runID": "7", "imageName": "a.jpg", "clr": "red",
                     "finalSize": "1.7 in", "finalColor": "", "createdTime": "2024-03-05 08:10:00"},
                    {"ID": "102", "runID": "7", "imageName": "b.jpg", "clr": "",
                     "finalSize": "2 in", "createdTime": "2024-03-05T08:20:00Z"}]"#,
                &["a.jpg", "b.jpg"],
            )
        }

        fn orchestrator(&self) -> Orchestrator {
            let source = FileRunSource::new(
                self.config.paths.snapshot_dir.clone(),
                self.config.paths.images_dir.clone(),
            );
            Orchestrator::new(
                self.config.clone(),
                Arc::new(self.store.clone()),
                Arc::new(self.target.clone()),
                Arc::new(source),
            )
        }

        fn request(&self) -> RunRequest {
            RunRequest::resolve(7, None, None, &self.config).unwrap()
        }
    }

    #[tokio::test]
    async fn test_migrate_completes_run() {
        let fx = Fixture::standard();
        let result = fx.orchestrator().migrate(&fx.request()).await.unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.blobs, BlobPhase::Uploaded { count: 2 });
        assert_eq!(result.report_id, Some(1));
        assert_eq!(result.fod_count, 2);
        assert_eq!(
            result.artifact_keys,
            vec![
                "FOD-Images-Map/run_7/report-offline-7-online-1.json",
                "FOD-Images-Map/run_7/fods-offline-7-online-1.json",
                "FOD-Images-Map/run_7/_SUCCESS.json",
            ]
        );

        let keys = fx.store.keys(BUCKET);
        assert!(keys.contains(&"FOD Images/a.jpg".to_string()));
        assert!(keys.contains(&"FOD Images/b.jpg".to_string()));

        let fods = fx.store
            .get(BUCKET, "FOD-Images-Map/run_7/fods-offline-7-online-1.json")
            .unwrap();
        let fods: serde_json::Value = serde_json::from_slice(&fods).unwrap();
        assert_eq!(fods, serde_json::json!({"101": 1, "102": 2}));

        let marker = fx.store.get(BUCKET, "FOD-Images-Map/run_7/_SUCCESS.json").unwrap();
        let marker = CompletionMarker::from_slice(&marker).unwrap();
        assert_eq!(marker.report_id, 1);
        assert_eq!(marker.artifacts.len(), 2);

        let state = fx.target.state();
        assert_eq!(state.connections, 1);
        assert_eq!(state.closed, 1);
        let (_, first) = &state.fods[0];
        assert_eq!(first.get("color").and_then(|v| v.as_text()), Some("red"));
        assert_eq!(
            first.get("locationLatitude").and_then(|v| v.as_text()),
            Some("36.5")
        );
        assert_eq!(first.get("material").and_then(|v| v.as_text()), Some("unknown"));
        assert_eq!(first.get("finalColor"), Some(&crate::core::FieldValue::Null));
        let (_, second) = &state.fods[1];
        assert_eq!(second.get("color"), Some(&crate::core::FieldValue::Null));
    }

    #[tokio::test]
    async fn test_second_invocation_is_a_no_op() {
        let fx = Fixture::standard();
        let orchestrator = fx.orchestrator();
        orchestrator.migrate(&fx.request()).await.unwrap();

        let puts = fx.store.state().puts;
        let (inserts, batches) = {
            let state = fx.target.state();
            (state.insert_calls, state.insert_many_calls)
        };

        let again = orchestrator.migrate(&fx.request()).await.unwrap();
        assert_eq!(again.status, RunStatus::Skipped);
        assert_eq!(again.skip_reason, Some(SkipReason::AlreadyMigrated));
        assert_eq!(again.blobs, BlobPhase::AlreadyPresent);

        assert_eq!(fx.store.state().puts, puts);
        let state = fx.target.state();
        assert_eq!(state.insert_calls, inserts);
        assert_eq!(state.insert_many_calls, batches);
        assert_eq!(state.connections, 1);
    }

    #[tokio::test]
    async fn test_artifacts_without_marker_skip_as_incomplete() {
        let fx = Fixture::standard();
        fx.store.state().objects.insert(
            (BUCKET.to_string(), "FOD-Images-Map/run_7/report-offline-7-online-9.json".into()),
            b"{}".to_vec(),
        );

        let result = fx.orchestrator().migrate(&fx.request()).await.unwrap();
        assert_eq!(result.status, RunStatus::Skipped);
        assert_eq!(result.skip_reason, Some(SkipReason::IncompleteMigration));
        assert_eq!(fx.target.state().connections, 0);
    }

    #[tokio::test]
    async fn test_other_run_prefix_does_not_skip() {
        let fx = Fixture::standard();
        fx.store.state().objects.insert(
            (BUCKET.to_string(), "FOD-Images-Map/run_70/_SUCCESS.json".into()),
            b"{}".to_vec(),
        );

        let result = fx.orchestrator().migrate(&fx.request()).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_present_blobs_are_not_uploaded_again() {
        let fx = Fixture::standard();
        fx.store.state().objects.insert(
            (BUCKET.to_string(), "FOD Images/a.jpg".into()),
            b"a.jpg".to_vec(),
        );

        let result = fx.orchestrator().migrate(&fx.request()).await.unwrap();
        assert_eq!(result.blobs, BlobPhase::AlreadyPresent);
        assert!(!fx.store.keys(BUCKET).contains(&"FOD Images/b.jpg".to_string()));
        assert_eq!(result.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_transform_failure_writes_nothing() {
        let fx = Fixture::new(
            r#"[{"ID": "101", "runID": "7", "imageName": "a.jpg", "clr": "red",
                 "finalSize": "no units", "createdTime": "2024-03-05 08:10:00"}]"#,
            &["a.jpg"],
        );

        let err = fx.orchestrator().migrate(&fx.request()).await.unwrap_err();
        assert_eq!(err.stage(), Some(RunPhase::Transform));
        assert!(err.to_string().contains("Malformed measurement"));

        let state = fx.target.state();
        assert_eq!(state.connections, 0);
        assert!(state.reports.is_empty());
    }

    #[tokio::test]
    async fn test_generated_id_shortfall_fails_identity_mapping() {
        let fx = Fixture::standard();
        fx.target.drop_generated_ids(1);

        let err = fx.orchestrator().migrate(&fx.request()).await.unwrap_err();
        assert_eq!(err.stage(), Some(RunPhase::MapIdentities));
        assert_eq!(err.exit_code(), EXIT_INTEGRITY_ERROR);
        assert!(!fx
            .store
            .keys(BUCKET)
            .iter()
            .any(|k| k.starts_with("FOD-Images-Map/")));
    }

    #[tokio::test]
    async fn test_run_without_detections() {
        let fx = Fixture::new("[]", &[]);

        let result = fx.orchestrator().migrate(&fx.request()).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.blobs, BlobPhase::NoBlobs);
        assert_eq!(result.fod_count, 0);
        assert_eq!(fx.target.state().insert_many_calls, 0);
    }

    #[tokio::test]
    async fn test_preview_has_no_side_effects() {
        let fx = Fixture::standard();
        let transformed = preview(&fx.config, &fx.request()).await.unwrap();

        assert_eq!(transformed.source_fod_ids(), vec![101, 102]);
        assert_eq!(
            transformed.fods[0].record.get("finalSize"),
            Some(&crate::core::FieldValue::Float(1.7))
        );
        assert!(fx.store.keys(BUCKET).is_empty());
        assert_eq!(fx.target.state().connections, 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let fx = Fixture::standard();
        let report = fx.orchestrator().health_check().await.unwrap();
        assert!(report.healthy());
        assert_eq!(report.target_type, "memory");
        assert_eq!(report.store_type, "memory");
    }

    #[test]
    fn test_request_requires_user_id() {
        let fx = Fixture::standard();
        let mut config = fx.config.clone();
        config.migration.user_id = None;
        assert!(matches!(
            RunRequest::resolve(7, None, None, &config),
            Err(MigrateError::Config(_))
        ));
        let request = RunRequest::resolve(7, Some("other".into()), Some(5), &config).unwrap();
        assert_eq!(request.bucket, "other");
        assert_eq!(request.user_id, 5);
    }

    #[test]
    fn test_result_json() {
        let result = finish(
            7,
            Utc::now(),
            RunStatus::Skipped,
            Some(SkipReason::AlreadyMigrated),
            BlobPhase::Uploaded { count: 2 },
        );
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["skip_reason"], "already_migrated");
        assert_eq!(json["blobs"]["outcome"], "uploaded");
        assert_eq!(json["blobs"]["count"], 2);
    }
}
