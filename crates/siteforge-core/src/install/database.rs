//! Verify or create the target schema.

use crate::db::{
    ConnectError, DatabaseAdmin, DatabaseHandle, DbEngine, normalize_charset, sanitize_identifier,
};
use crate::error::{PipelineError, describe};
use crate::notice::NoticeLog;
use crate::site::DatabaseCredentials;

/// Open connection plus the charset and engine the site will use.
pub struct ProvisionedDatabase {
    pub handle: Box<dyn DatabaseHandle>,
    pub charset: String,
    pub engine: DbEngine,
}

impl std::fmt::Debug for ProvisionedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionedDatabase")
            .field("charset", &self.charset)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

pub fn provision_database(
    admin: &dyn DatabaseAdmin,
    creds: &DatabaseCredentials,
    log: &mut NoticeLog,
) -> Result<ProvisionedDatabase, PipelineError> {
    let charset = normalize_charset(&creds.charset);
    let engine = DbEngine::from_request(&creds.engine);

    let handle = match admin.connect(creds, true) {
        Ok(handle) => handle,
        Err(ConnectError::UnknownSchema(_)) => {
            log.message(format!(
                "Database '{}' does not exist, creating it",
                creds.name
            ));
            create_schema(admin, creds, &charset, log)?
        }
        Err(ConnectError::Other(err)) => {
            return Err(PipelineError::database(format!(
                "Database connection failed for {}@{}:{}: {}",
                creds.user,
                creds.host,
                creds.port,
                describe(&err)
            )));
        }
    };

    log.outcomes.connection_ok = true;
    log.message(format!("Database connection OK ({})", creds.name));

    Ok(ProvisionedDatabase {
        handle,
        charset,
        engine,
    })
}

fn create_schema(
    admin: &dyn DatabaseAdmin,
    creds: &DatabaseCredentials,
    charset: &str,
    log: &mut NoticeLog,
) -> Result<Box<dyn DatabaseHandle>, PipelineError> {
    let name = sanitize_identifier(&creds.name);
    if name.is_empty() || name != creds.name {
        return Err(PipelineError::database(format!(
            "Refusing to create database '{}': names may only contain a-z, A-Z, 0-9 and _",
            creds.name
        )));
    }
    let safe_charset = sanitize_identifier(charset);
    if safe_charset != charset {
        return Err(PipelineError::database(format!(
            "Refusing to create database with charset '{charset}'"
        )));
    }

    let mut server = admin.connect(creds, false).map_err(|e| {
        PipelineError::database(format!(
            "Unable to connect to database server {}:{}: {}",
            creds.host, creds.port, e
        ))
    })?;

    let statement = format!("CREATE SCHEMA IF NOT EXISTS `{name}` CHARACTER SET {safe_charset}");
    server.execute(&statement).map_err(|e| {
        PipelineError::database(format!(
            "Failed to create database '{}': {}",
            name,
            describe(&e)
        ))
    })?;
    drop(server);

    log.outcomes.schema_created = true;
    log.message(format!("Created database '{name}'"));

    admin.connect(creds, true).map_err(|e| {
        PipelineError::database(format!(
            "Created database '{name}' but could not connect to it: {e}"
        ))
    })
}
