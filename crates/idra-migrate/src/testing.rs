//! In-memory stores for unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::schema::{FOD_REPORT_COLUMN, REPORT_OWNER_COLUMN};
use crate::core::{FieldValue, ObjectStore, Record, TargetConnector, TargetStore};
use crate::error::{MigrateError, Result};

#[derive(Debug, Default, Clone)]
pub struct TargetState {
    /// `(reportID, record)` in insertion order.
    pub reports: Vec<(i64, Record)>,
    /// `(fodID, record)` in insertion order.
    pub fods: Vec<(i64, Record)>,
    pub insert_calls: usize,
    pub insert_many_calls: usize,
    pub connections: usize,
    pub closed: usize,
    fail_report_insert: bool,
    fail_batch_insert: bool,
    drop_generated_ids: usize,
}

/// Shared fake of the online database. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct MemoryTarget {
    state: Arc<Mutex<TargetState>>,
}

impl MemoryTarget {
    pub fn state(&self) -> MutexGuard<'_, TargetState> {
        self.state.lock().unwrap()
    }

    pub fn fail_report_insert(&self) {
        self.state().fail_report_insert = true;
    }

    pub fn fail_batch_insert(&self) {
        self.state().fail_batch_insert = true;
    }

    /// Make `fod_ids` return `n` fewer ids than were inserted.
    pub fn drop_generated_ids(&self, n: usize) {
        self.state().drop_generated_ids = n;
    }

    fn int(record: &Record, column: &str) -> Option<i64> {
        match record.get(column) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

fn injected(what: &str) -> MigrateError {
    MigrateError::connection(format!("injected {} failure", what), "memory target")
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn insert(&mut self, record: &Record) -> Result<()> {
        let mut state = self.state();
        state.insert_calls += 1;
        if state.fail_report_insert {
            return Err(injected("insert"));
        }
        let id = state.reports.len() as i64 + 1;
        state.reports.push((id, record.clone()));
        Ok(())
    }

    async fn insert_many(&mut self, records: &[Record]) -> Result<()> {
        let mut state = self.state();
        state.insert_many_calls += 1;
        if state.fail_batch_insert {
            return Err(injected("batch insert"));
        }
        for record in records {
            let id = state.fods.len() as i64 + 1;
            state.fods.push((id, record.clone()));
        }
        Ok(())
    }

    async fn latest_report_id(&mut self, user_id: i64) -> Result<Option<i64>> {
        let state = self.state();
        Ok(state
            .reports
            .iter()
            .filter(|(_, r)| Self::int(r, REPORT_OWNER_COLUMN) == Some(user_id))
            .map(|(id, _)| *id)
            .max())
    }

    async fn fod_ids(&mut self, report_id: i64) -> Result<Vec<i64>> {
        let state = self.state();
        let mut ids: Vec<i64> = state
            .fods
            .iter()
            .filter(|(_, r)| Self::int(r, FOD_REPORT_COLUMN) == Some(report_id))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        let keep = ids.len().saturating_sub(state.drop_generated_ids);
        ids.truncate(keep);
        Ok(ids)
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state().closed += 1;
        Ok(())
    }
}

#[async_trait]
impl TargetConnector for MemoryTarget {
    async fn connect(&self) -> Result<Box<dyn TargetStore>> {
        self.state().connections += 1;
        Ok(Box::new(self.clone()))
    }

    fn db_type(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Default)]
pub struct StoreState {
    /// `(bucket, key) -> body`
    pub objects: BTreeMap<(String, String), Vec<u8>>,
    pub puts: usize,
    /// Keys whose put fails.
    pub failing_keys: Vec<String>,
}

/// Shared fake of the object store. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    pub fn fail_put(&self, key: &str) {
        self.state().failing_keys.push(key.to_string());
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.state()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let mut state = self.state();
        if state.failing_keys.iter().any(|k| k == key) {
            return Err(MigrateError::storage("put", bucket, key, "injected failure"));
        }
        state.puts += 1;
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .state()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn list(&self, bucket: &str, prefix: &str, limit: usize) -> Result<usize> {
        Ok(self
            .state()
            .objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .take(limit)
            .count())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
