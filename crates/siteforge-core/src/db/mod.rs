//! Database administration seams and MySQL implementation.

pub mod dump;
pub mod mysql;

use serde::Serialize;

use crate::site::DatabaseCredentials;

pub use mysql::MySqlAdmin;

const DEFAULT_CHARSET: &str = "utf8";

/// Why a connection attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The server is reachable but the named schema does not exist.
    #[error("Unknown database '{0}'")]
    UnknownSchema(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Opens connections to the database server.
pub trait DatabaseAdmin {
    /// Connect with the credentials, selecting the named schema when
    /// `use_schema` is set.
    fn connect(
        &self,
        creds: &DatabaseCredentials,
        use_schema: bool,
    ) -> Result<Box<dyn DatabaseHandle>, ConnectError>;
}

/// An open connection; lives for one pipeline run.
pub trait DatabaseHandle {
    fn execute(&mut self, sql: &str) -> anyhow::Result<()>;

    /// Names of the tables in the selected schema.
    fn table_names(&mut self) -> anyhow::Result<Vec<String>>;
}

/// Storage engine for created tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DbEngine {
    MyIsam,
    InnoDb,
}

impl DbEngine {
    /// Anything other than exactly `InnoDB` selects MyISAM.
    pub fn from_request(value: &str) -> Self {
        if value == "InnoDB" {
            DbEngine::InnoDb
        } else {
            DbEngine::MyIsam
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DbEngine::MyIsam => "MyISAM",
            DbEngine::InnoDb => "InnoDB",
        }
    }
}

/// Lower-case the charset, falling back to `utf8` when it holds anything
/// outside `[a-z0-9]`.
pub fn normalize_charset(value: &str) -> String {
    let lower = value.trim().to_ascii_lowercase();
    if lower.is_empty()
        || !lower
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    {
        return DEFAULT_CHARSET.to_string();
    }
    lower
}

pub fn is_default_charset(charset: &str) -> bool {
    charset == DEFAULT_CHARSET
}

/// Keep only ASCII alphanumerics and underscores.
pub fn sanitize_identifier(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
