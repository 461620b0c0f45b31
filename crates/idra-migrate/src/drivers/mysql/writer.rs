//! MySQL target store over a single connection.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, TxOpts, Value};
use tracing::debug;

use crate::core::schema::{FOD_REPORT_COLUMN, FOD_SCHEMA, REPORT_OWNER_COLUMN, REPORT_SCHEMA};
use crate::core::{FieldValue, Record, TableSchema, TargetStore};
use crate::error::{MigrateError, Result};

/// MySQL max placeholders per prepared statement.
const MYSQL_MAX_PLACEHOLDERS: usize = 65535;

/// [`TargetStore`] backed by one `mysql_async` connection.
pub struct MysqlTarget {
    conn: Conn,
}

impl MysqlTarget {
    pub fn new(conn: Conn) -> Self {
        Self { conn }
    }

    /// Quote a MySQL identifier.
    fn quote_ident(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn insert_sql(schema: &TableSchema, rows: usize) -> String {
        let col_list = schema
            .columns
            .iter()
            .map(|c| Self::quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders_per_row = format!("({})", vec!["?"; schema.columns.len()].join(", "));
        let all_placeholders = vec![placeholders_per_row; rows].join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            Self::quote_ident(schema.table),
            col_list,
            all_placeholders
        )
    }
}

#[async_trait]
impl TargetStore for MysqlTarget {
    async fn insert(&mut self, record: &Record) -> Result<()> {
        let schema = record.schema();
        let sql = Self::insert_sql(schema, 1);
        let params: Vec<Value> = record.values().iter().map(field_value_to_mysql).collect();

        self.conn.exec_drop(&sql, params).await?;
        debug!("MySQL: inserted 1 row into {}", schema.table);
        Ok(())
    }

    async fn insert_many(&mut self, records: &[Record]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let schema = first.schema();
        let num_cols = schema.columns.len();
        let max_rows_per_batch = (MYSQL_MAX_PLACEHOLDERS / num_cols).max(1);

        // Start transaction; dropping it uncommitted rolls back
        let mut tx = self.conn.start_transaction(TxOpts::default()).await?;

        for chunk in records.chunks(max_rows_per_batch) {
            let sql = Self::insert_sql(schema, chunk.len());
            let params: Vec<Value> = chunk
                .iter()
                .flat_map(|record| record.values().iter().map(field_value_to_mysql))
                .collect();

            if let Err(e) = tx.exec_drop(&sql, params).await {
                tx.rollback().await.ok();
                return Err(e.into());
            }
        }

        tx.commit().await?;
        debug!("MySQL: inserted {} rows into {}", records.len(), schema.table);
        Ok(())
    }

    async fn latest_report_id(&mut self, user_id: i64) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT {key} FROM {table} WHERE {owner} = ? ORDER BY {key} DESC LIMIT 1",
            key = Self::quote_ident(REPORT_SCHEMA.key),
            table = Self::quote_ident(REPORT_SCHEMA.table),
            owner = Self::quote_ident(REPORT_OWNER_COLUMN),
        );
        Ok(self.conn.exec_first::<i64, _, _>(sql, (user_id,)).await?)
    }

    async fn fod_ids(&mut self, report_id: i64) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT {key} FROM {table} WHERE {report} = ? ORDER BY {key} ASC",
            key = Self::quote_ident(FOD_SCHEMA.key),
            table = Self::quote_ident(FOD_SCHEMA.table),
            report = Self::quote_ident(FOD_REPORT_COLUMN),
        );
        Ok(self.conn.exec::<i64, _, _>(sql, (report_id,)).await?)
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn
            .query_drop("SELECT 1")
            .await
            .map_err(|e| MigrateError::connection(e, "testing MySQL connection"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

/// Convert FieldValue to mysql_async::Value.
fn field_value_to_mysql(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::NULL,
        FieldValue::Int(i) => Value::from(*i),
        FieldValue::Float(f) => Value::from(*f),
        FieldValue::Text(_) | FieldValue::DateTime(_) => match value.to_param_string() {
            Some(s) => Value::from(s),
            None => Value::NULL,
        },
    }
}
