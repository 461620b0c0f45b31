//! MySQL/MariaDB online database driver.
//!
//! - [`MysqlConnector`]: opens one connection per run
//! - [`MysqlTarget`]: typed inserts and id lookups over that connection
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod writer;

pub use writer::MysqlTarget;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, SslOpts};
use tracing::{info, warn};

use crate::config::TargetConfig;
use crate::core::{TargetConnector, TargetStore};
use crate::error::{MigrateError, Result};

/// Opens [`MysqlTarget`] connections from a [`TargetConfig`].
#[derive(Debug, Clone)]
pub struct MysqlConnector {
    config: TargetConfig,
}

impl MysqlConnector {
    pub fn new(config: TargetConfig) -> Self {
        Self { config }
    }

    fn opts(&self) -> Opts {
        let config = &self.config;
        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => Some(SslOpts::default()),
            _ => {
                warn!(
                    "Unknown ssl_mode '{}', defaulting to Preferred",
                    config.ssl_mode
                );
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        builder.into()
    }
}

#[async_trait]
impl TargetConnector for MysqlConnector {
    async fn connect(&self) -> Result<Box<dyn TargetStore>> {
        let context = format!(
            "connecting to MySQL {}:{}/{}",
            self.config.host, self.config.port, self.config.database
        );
        let mut conn = Conn::new(self.opts())
            .await
            .map_err(|e| MigrateError::connection(e, context.clone()))?;

        // Test connection
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| MigrateError::connection(e, context))?;

        info!(
            "Connected to MySQL target: {}:{}/{}",
            self.config.host, self.config.port, self.config.database
        );
        Ok(Box::new(MysqlTarget::new(conn)))
    }

    fn db_type(&self) -> &'static str {
        "mysql"
    }
}
