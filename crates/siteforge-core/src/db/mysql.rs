//! MySQL/MariaDB administration through sqlx.
//!
//! The pipeline is synchronous, so each handle owns a tokio runtime and
//! blocks on every call.

use std::time::Duration;

use anyhow::Context;
use sqlx::Connection;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError};

use super::{ConnectError, DatabaseAdmin, DatabaseHandle, normalize_charset};
use crate::site::DatabaseCredentials;

/// Server error number for "Unknown database".
const ER_BAD_DB_ERROR: u16 = 1049;

#[derive(Debug, Clone)]
pub struct MySqlAdmin {
    connect_timeout: Duration,
}

impl Default for MySqlAdmin {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl MySqlAdmin {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn options(creds: &DatabaseCredentials, use_schema: bool) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&creds.host)
            .port(creds.port)
            .username(&creds.user)
            .password(&creds.password)
            .charset(&normalize_charset(&creds.charset));
        if use_schema {
            options.database(&creds.name)
        } else {
            options
        }
    }
}

impl DatabaseAdmin for MySqlAdmin {
    fn connect(
        &self,
        creds: &DatabaseCredentials,
        use_schema: bool,
    ) -> Result<Box<dyn DatabaseHandle>, ConnectError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;

        let options = Self::options(creds, use_schema);
        let timeout = self.connect_timeout;
        let result = runtime.block_on(async {
            tokio::time::timeout(timeout, MySqlConnection::connect_with(&options)).await
        });

        let conn = match result {
            Ok(Ok(conn)) => conn,
            Ok(Err(err)) => return Err(classify(err, &creds.name)),
            Err(_) => {
                return Err(ConnectError::Other(anyhow::anyhow!(
                    "Timed out connecting to {}:{} after {}s",
                    creds.host,
                    creds.port,
                    timeout.as_secs()
                )));
            }
        };

        tracing::debug!(
            "connected to mysql at {}:{} (schema selected: {})",
            creds.host,
            creds.port,
            use_schema
        );
        Ok(Box::new(MySqlHandle { conn, runtime }))
    }
}

fn classify(err: sqlx::Error, schema: &str) -> ConnectError {
    if let sqlx::Error::Database(db_err) = &err
        && let Some(mysql) = db_err.try_downcast_ref::<MySqlDatabaseError>()
        && mysql.number() == ER_BAD_DB_ERROR
    {
        return ConnectError::UnknownSchema(schema.to_string());
    }
    ConnectError::Other(anyhow::Error::new(err).context("Database connection failed"))
}

// Field order matters: the connection must drop before its runtime
struct MySqlHandle {
    conn: MySqlConnection,
    runtime: tokio::runtime::Runtime,
}

impl DatabaseHandle for MySqlHandle {
    fn execute(&mut self, sql: &str) -> anyhow::Result<()> {
        self.runtime
            .block_on(sqlx::raw_sql(sql).execute(&mut self.conn))
            .with_context(|| format!("Failed to execute: {}", preview(sql)))?;
        Ok(())
    }

    fn table_names(&mut self) -> anyhow::Result<Vec<String>> {
        self.runtime
            .block_on(sqlx::query_scalar::<MySql, String>("SHOW TABLES").fetch_all(&mut self.conn))
            .context("Failed to list tables")
    }
}

fn preview(sql: &str) -> String {
    const MAX: usize = 120;
    let line = sql.trim().lines().next().unwrap_or_default();
    if line.chars().count() > MAX {
        let cut: String = line.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}
