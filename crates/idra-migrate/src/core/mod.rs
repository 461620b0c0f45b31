//! Core abstractions for the migration pipeline.
//!
//! - [`value`]: field values of target records
//! - [`schema`]: target table schemas, schema-bound records, transformer payloads
//! - [`row`]: text-typed rows exported from the offline store
//! - [`traits`]: capability traits for the object store and the online database

pub mod row;
pub mod schema;
pub mod traits;
pub mod value;

pub use row::SourceRow;
pub use schema::{
    FodPayload, Record, ReportPayload, TableSchema, TransformedRun, FOD_SCHEMA, REPORT_SCHEMA,
};
pub use traits::{object_key, ObjectStore, TargetConnector, TargetStore};
pub use value::{FieldValue, TIMESTAMP_FORMAT};
