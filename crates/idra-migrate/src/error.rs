//! Error types for the migration library.

use thiserror::Error;

use crate::orchestrator::RunPhase;

/// Exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for relational store connection errors.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for object store transport errors.
pub const EXIT_STORAGE_ERROR: u8 = 3;
/// Exit code for malformed source data.
pub const EXIT_TRANSFORM_ERROR: u8 = 4;
/// Exit code for identity-map integrity faults.
pub const EXIT_INTEGRITY_ERROR: u8 = 5;
/// Exit code for target write failures.
pub const EXIT_TARGET_ERROR: u8 = 6;
/// Exit code for local file errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, bad mapping files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Relational store unreachable or not connected
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Object store request failed
    #[error("Storage error during {operation} of s3://{bucket}/{key}: {message}")]
    StorageTransport {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },

    /// One or more uploads in a batch failed
    #[error("{failed} of {total} uploads failed; first failure: {first}")]
    Upload {
        failed: usize,
        total: usize,
        first: String,
    },

    /// A timestamp could not be parsed in any supported format
    #[error("Malformed timestamp in field {field}: '{value}'")]
    MalformedTimestamp { field: String, value: String },

    /// A measurement has no leading numeric token
    #[error("Malformed measurement in field {field}: '{value}'")]
    MalformedMeasurement { field: String, value: String },

    /// A numeric field could not be parsed as an integer
    #[error("Invalid number in field {field}: '{value}'")]
    InvalidNumber { field: String, value: String },

    /// A mapped field was found neither on the record's own row nor on the run row
    #[error("Mapped field {field} missing from {record} row and from run {run_id}")]
    MissingMappedField {
        field: String,
        record: String,
        run_id: i64,
    },

    /// The run has no row in the run snapshot
    #[error("Run {0} not found in source snapshot")]
    RunNotFound(i64),

    /// Source and generated identifier sequences differ in length
    #[error(
        "Identity map length mismatch for run {run_id}: {source_count} source ids, \
         {target_count} generated ids"
    )]
    IdentityMapLengthMismatch {
        run_id: i64,
        source_count: usize,
        target_count: usize,
    },

    /// The parent record was inserted but its generated id could not be read back
    #[error("No generated report id found for user {0} after insert")]
    MissingGeneratedId(i64),

    /// Target database query error
    #[error("Target database error: {0}")]
    Target(#[from] mysql_async::Error),

    /// Offline source database error
    #[error("Source database error: {0}")]
    Source(#[from] rusqlite::Error),

    /// A pipeline stage failed
    #[error("Stage {stage} failed: {source}")]
    Stage {
        stage: RunPhase,
        #[source]
        source: Box<MigrateError>,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a StorageTransport error
    pub fn storage(
        operation: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        MigrateError::StorageTransport {
            operation,
            bucket: bucket.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Attach the failing pipeline stage. Already-staged errors are left alone.
    pub fn in_stage(self, stage: RunPhase) -> Self {
        match self {
            MigrateError::Stage { .. } => self,
            other => MigrateError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was raised in, if known.
    pub fn stage(&self) -> Option<RunPhase> {
        match self {
            MigrateError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Process exit code for this error family.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Stage { source, .. } => source.exit_code(),
            MigrateError::Config(_) | MigrateError::Yaml(_) => EXIT_CONFIG_ERROR,
            MigrateError::Connection { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::StorageTransport { .. } | MigrateError::Upload { .. } => {
                EXIT_STORAGE_ERROR
            }
            MigrateError::MalformedTimestamp { .. }
            | MigrateError::MalformedMeasurement { .. }
            | MigrateError::InvalidNumber { .. }
            | MigrateError::MissingMappedField { .. }
            | MigrateError::RunNotFound(_)
            | MigrateError::Source(_) => EXIT_TRANSFORM_ERROR,
            MigrateError::IdentityMapLengthMismatch { .. }
            | MigrateError::MissingGeneratedId(_) => EXIT_INTEGRITY_ERROR,
            MigrateError::Target(_) => EXIT_TARGET_ERROR,
            MigrateError::Io(_) | MigrateError::Json(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
