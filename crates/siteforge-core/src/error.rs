//! Error taxonomy for the installation pipeline.

use serde::{Serialize, Serializer};

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Environment,
    Database,
    Import,
    Relocation,
    RemoteProvision,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Environment => "environment",
            ErrorKind::Database => "database",
            ErrorKind::Import => "import",
            ErrorKind::Relocation => "relocation",
            ErrorKind::RemoteProvision => "remote_provision",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// Site specification is incomplete. Raised by callers, never by steps.
    #[error("{0}")]
    Validation(String),
    /// Missing or non-writable paths, bad archive contents, failed file writes.
    #[error("{0}")]
    Environment(String),
    /// Connection failures, refused schema names, failed schema creation.
    #[error("{0}")]
    Database(String),
    /// SQL restore failures.
    #[error("{0}")]
    Import(String),
    /// Moving the site tree or runtime entries failed.
    #[error("{0}")]
    Relocation(String),
    /// Neither callback protocol reached the new site.
    #[error("{0}")]
    RemoteProvision(String),
}

impl PipelineError {
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import(message.into())
    }

    pub fn relocation(message: impl Into<String>) -> Self {
        Self::Relocation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Environment(_) => ErrorKind::Environment,
            PipelineError::Database(_) => ErrorKind::Database,
            PipelineError::Import(_) => ErrorKind::Import,
            PipelineError::Relocation(_) => ErrorKind::Relocation,
            PipelineError::RemoteProvision(_) => ErrorKind::RemoteProvision,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PipelineError::Validation(m)
            | PipelineError::Environment(m)
            | PipelineError::Database(m)
            | PipelineError::Import(m)
            | PipelineError::Relocation(m)
            | PipelineError::RemoteProvision(m) => m,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", self.message())?;
        state.end()
    }
}

/// Render an anyhow chain as a single line for notice output.
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
